// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Static routes

use crate::{ConfigError, ConfigResult};
use lpm::prefix::AnyPrefix;
use serde::{Deserialize, Serialize};
use state::RouterId;
use std::net::IpAddr;
use tracing::debug;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteAction {
    #[default]
    NextHops,
    Drop,
    ToCpu,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticRouteConfig {
    #[serde(default)]
    pub vrf: RouterId,
    pub prefix: AnyPrefix,
    #[serde(default)]
    pub action: RouteAction,
    #[serde(default)]
    pub nexthops: Vec<IpAddr>,
}

impl StaticRouteConfig {
    #[must_use]
    pub fn via(prefix: AnyPrefix, nexthops: &[IpAddr]) -> Self {
        Self {
            vrf: RouterId::DEFAULT,
            prefix,
            action: RouteAction::NextHops,
            nexthops: nexthops.to_vec(),
        }
    }

    #[must_use]
    pub fn with_action(prefix: AnyPrefix, action: RouteAction) -> Self {
        Self {
            vrf: RouterId::DEFAULT,
            prefix,
            action,
            nexthops: vec![],
        }
    }

    pub fn validate(&self) -> ConfigResult {
        debug!("Validating static route {self}..");
        match self.action {
            RouteAction::NextHops if self.nexthops.is_empty() => Err(ConfigError::InvalidRoute(
                self.prefix.to_string(),
                "no next-hops given",
            )),
            RouteAction::Drop | RouteAction::ToCpu if !self.nexthops.is_empty() => Err(
                ConfigError::InvalidRoute(self.prefix.to_string(), "next-hops given without forwarding"),
            ),
            _ => {
                let family_mismatch = self
                    .nexthops
                    .iter()
                    .any(|nh| nh.is_ipv4() != self.prefix.is_ipv4());
                if family_mismatch {
                    return Err(ConfigError::InvalidRoute(
                        self.prefix.to_string(),
                        "next-hop of another address family",
                    ));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn prefix(s: &str) -> AnyPrefix {
        s.parse().unwrap()
    }

    #[test]
    fn test_validate() {
        let nh: IpAddr = "10.0.0.1".parse().unwrap();
        assert_eq!(StaticRouteConfig::via(prefix("192.168.0.0/16"), &[nh]).validate(), Ok(()));
        assert_eq!(
            StaticRouteConfig::via(prefix("192.168.0.0/16"), &[]).validate(),
            Err(ConfigError::InvalidRoute(
                "192.168.0.0/16".to_owned(),
                "no next-hops given"
            ))
        );
        assert_eq!(
            StaticRouteConfig::via(prefix("2001:db8::/32"), &[nh]).validate(),
            Err(ConfigError::InvalidRoute(
                "2001:db8::/32".to_owned(),
                "next-hop of another address family"
            ))
        );
        assert_eq!(
            StaticRouteConfig::with_action(prefix("0.0.0.0/0"), RouteAction::Drop).validate(),
            Ok(())
        );
        let mut to_cpu = StaticRouteConfig::with_action(prefix("10.1.0.0/16"), RouteAction::ToCpu);
        to_cpu.nexthops.push(nh);
        assert!(to_cpu.validate().is_err());
    }

    #[test]
    fn test_deserialize() {
        let route: StaticRouteConfig =
            serde_yaml_ng::from_str("prefix: 10.10.0.0/16\naction: to_cpu\nvrf: 3\n").unwrap();
        assert_eq!(route.action, RouteAction::ToCpu);
        assert_eq!(route.vrf, RouterId(3));
        assert!(route.nexthops.is_empty());
    }
}
