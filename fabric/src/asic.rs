// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Fabric related properties of the ASIC families

use state::AsicType;

/// What the connectivity computations need to know about an ASIC
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AsicProfile {
    /// Number of consecutive switch ids owned by one ASIC
    pub num_cores: u64,
    /// Size of the port id space of one ASIC. On multi-NPU nodes the port ids of the n-th NPU
    /// start at `n * max_ports`.
    pub max_ports: u32,
    pub virtual_devices: u32,
    pub fabric_ports_per_virtual_device: u32,
    /// Local fabric port ids are shifted by this much with respect to the port ids the ASIC
    /// reports to its link partners.
    pub remote_port_offset: u32,
}

impl AsicProfile {
    #[must_use]
    pub const fn of(asic: AsicType) -> Self {
        match asic {
            AsicType::Jericho2 => Self {
                num_cores: 2,
                max_ports: 2048,
                virtual_devices: 1,
                fabric_ports_per_virtual_device: 112,
                remote_port_offset: 256,
            },
            AsicType::Jericho3 => Self {
                num_cores: 4,
                max_ports: 2048,
                virtual_devices: 1,
                fabric_ports_per_virtual_device: 160,
                remote_port_offset: 1024,
            },
            AsicType::Ramon => Self {
                num_cores: 4,
                max_ports: 192,
                virtual_devices: 4,
                fabric_ports_per_virtual_device: 48,
                remote_port_offset: 0,
            },
            AsicType::Ramon3 => Self {
                num_cores: 2,
                max_ports: 512,
                virtual_devices: 2,
                fabric_ports_per_virtual_device: 128,
                remote_port_offset: 0,
            },
            AsicType::Tomahawk4 | AsicType::Fake => Self {
                num_cores: 1,
                max_ports: 1024,
                virtual_devices: 1,
                fabric_ports_per_virtual_device: 0,
                remote_port_offset: 0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_are_consistent() {
        for asic in [
            AsicType::Jericho2,
            AsicType::Jericho3,
            AsicType::Ramon,
            AsicType::Ramon3,
            AsicType::Tomahawk4,
            AsicType::Fake,
        ] {
            let p = AsicProfile::of(asic);
            assert!(p.num_cores >= 1, "{asic}");
            assert!(p.virtual_devices >= 1, "{asic}");
            assert!(
                p.fabric_ports_per_virtual_device * p.virtual_devices <= p.max_ports,
                "{asic}"
            );
        }
        assert_eq!(AsicProfile::of(AsicType::Jericho2).remote_port_offset, 256);
        assert_eq!(AsicProfile::of(AsicType::Ramon).remote_port_offset, 0);
    }
}
