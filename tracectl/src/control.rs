// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Tracing runtime control.

use ordermap::{OrderMap, OrderSet};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use thiserror::Error;
#[allow(unused)]
use tracing::{debug, error, info, warn};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, Registry, filter::LevelFilter, prelude::*, reload};

use crate::display::TargetsByTag;
use crate::targets::TRACE_TARGETS;
use crate::{DEFAULT_DEFAULT_LOGLEVEL, trace_target};

trace_target!("tracectl", LevelFilter::INFO, &[]);

/// Errors when configuring tracing from strings or tag lists
#[derive(Debug, Error, PartialEq)]
pub enum TraceCtlError {
    #[error("Invalid syntax '{0}': expected tag=level")]
    Syntax(String),
    #[error("Invalid log-level '{0}'")]
    BadLevel(String),
    #[error("Unknown tracing tag '{0}'")]
    UnknownTag(String),
}

/// The configuration of a single tracing target
#[derive(Debug, Clone)]
pub struct TargetCfg {
    pub(crate) target: &'static str,
    pub(crate) name: &'static str,
    pub(crate) level: LevelFilter,
    pub(crate) tags: Vec<&'static str>,
    pub(crate) custom: bool,
}
impl TargetCfg {
    #[must_use]
    pub fn target(&self) -> &'static str {
        self.target
    }
    #[must_use]
    pub fn level(&self) -> LevelFilter {
        self.level
    }
    #[must_use]
    pub fn is_custom(&self) -> bool {
        self.custom
    }
}

/// The database of known targets, indexed by target and by tag.
/// A target's name is always one of its tags.
#[derive(Debug)]
pub(crate) struct TargetCfgDb {
    pub(crate) level: LevelFilter,
    pub(crate) targets: OrderMap<&'static str, TargetCfg>,
    pub(crate) tags: OrderMap<&'static str, OrderSet<&'static str>>,
}

impl TargetCfgDb {
    fn load(level: LevelFilter) -> Self {
        let mut db = Self {
            level,
            targets: OrderMap::new(),
            tags: OrderMap::new(),
        };
        for decl in TRACE_TARGETS {
            let mut tags = decl.tags.to_vec();
            if !tags.contains(&decl.name) {
                tags.push(decl.name);
            }
            db.insert(TargetCfg {
                target: decl.target,
                name: decl.name,
                level: decl.level,
                tags,
                custom: decl.custom,
            });
        }
        db
    }
    fn insert(&mut self, cfg: TargetCfg) {
        for tag in &cfg.tags {
            self.tags.entry(tag).or_default().insert(cfg.target);
        }
        if let Some(prior) = self.targets.insert(cfg.target, cfg) {
            warn!("Tracing target {} was declared more than once", prior.target);
        }
    }
    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::new(self.level.to_string());
        for cfg in self.targets.values() {
            match format!("{}={}", cfg.target, cfg.level).parse() {
                Ok(directive) => filter = filter.add_directive(directive),
                Err(e) => error!("Could not build directive for target {}: {e}", cfg.target),
            }
        }
        filter
    }
    pub(crate) fn tagged(&self, tag: &str) -> impl Iterator<Item = &TargetCfg> {
        let members = self.tags.get(tag);
        self.targets
            .values()
            .filter(move |cfg| members.is_some_and(|m| m.contains(cfg.target)))
    }
    fn set_tag_level(&mut self, tag: &str, level: LevelFilter) -> usize {
        let Some(members) = self.tags.get(tag) else {
            return 0;
        };
        let mut changed = 0;
        for target in members {
            if let Some(cfg) = self.targets.get_mut(target)
                && cfg.level != level
            {
                cfg.level = level;
                changed += 1;
            }
        }
        changed
    }
    /// A string that, fed to [`TracingControl::setup_from_string`], reproduces the current levels
    fn as_config_string(&self) -> String {
        let mut out = format!("default={}", self.level);
        for cfg in self.targets.values() {
            out += &format!(",{}={}", cfg.name, cfg.level);
        }
        out
    }
}

/// Parse a string of comma-separated `tag=level` items
fn parse_tracing_config(input: &str) -> Result<OrderMap<String, LevelFilter>, TraceCtlError> {
    let mut result = OrderMap::new();
    for item in input.split(',').map(str::trim).filter(|i| !i.is_empty()) {
        let (tag, level) = item
            .split_once('=')
            .ok_or_else(|| TraceCtlError::Syntax(item.to_owned()))?;
        let level = LevelFilter::from_str(level.trim())
            .map_err(|_| TraceCtlError::BadLevel(level.trim().to_owned()))?;
        result.insert(tag.trim().to_owned(), level);
    }
    Ok(result)
}

/// Process-wide tracing controller. There is a single instance, see [`get_trace_ctl`].
#[derive(Debug)]
pub struct TracingControl {
    db: Mutex<TargetCfgDb>,
    reload_filter: reload::Handle<EnvFilter, Registry>,
}

static TRACING_CTL: OnceLock<TracingControl> = OnceLock::new();

/// Get the tracing controller, installing the global subscriber on first use
pub fn get_trace_ctl() -> &'static TracingControl {
    TRACING_CTL.get_or_init(TracingControl::install)
}

impl TracingControl {
    fn install() -> Self {
        let db = TargetCfgDb::load(DEFAULT_DEFAULT_LOGLEVEL);
        let (filter, reload_filter) = reload::Layer::new(db.env_filter());
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_line_number(true)
            .with_target(true)
            .with_thread_names(true)
            .with_level(true);

        // another subscriber may have been installed (e.g. by a test harness)
        if let Err(e) = tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .with(ErrorLayer::default())
            .try_init()
        {
            eprintln!("Tracing subscriber not installed: {e}");
        }
        Self {
            db: Mutex::new(db),
            reload_filter,
        }
    }
    fn db(&self) -> MutexGuard<'_, TargetCfgDb> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }
    fn reload(&self, db: &TargetCfgDb) {
        if let Err(e) = self.reload_filter.reload(db.env_filter()) {
            error!("Failed to reload tracing filter: {e}");
        }
    }

    pub fn init() {
        get_trace_ctl();
    }

    /// Set the level of all the targets that have the given tag
    pub fn set_tag_level(&self, tag: &str, level: LevelFilter) {
        let mut db = self.db();
        let changed = db.set_tag_level(tag, level);
        if changed > 0 {
            self.reload(&db);
        }
        debug!("Log level for tag '{tag}' set to {level} ({changed} targets changed)");
    }
    pub fn set_level_all(&self, level: LevelFilter) {
        let mut db = self.db();
        db.targets.values_mut().for_each(|cfg| cfg.level = level);
        self.reload(&db);
    }
    pub fn set_default_level(&self, level: LevelFilter) {
        let mut db = self.db();
        if db.level != level {
            db.level = level;
            self.reload(&db);
            info!("Default log level is now {level}");
        }
    }
    #[must_use]
    pub fn get_default_level(&self) -> LevelFilter {
        self.db().level
    }

    /// Check that all the tags exist
    pub fn check_tags(&self, tags: &[&str]) -> Result<(), TraceCtlError> {
        let db = self.db();
        match tags
            .iter()
            .find(|t| !db.tags.contains_key(**t) && !matches!(**t, "default" | "all"))
        {
            Some(unknown) => Err(TraceCtlError::UnknownTag((*unknown).to_owned())),
            None => Ok(()),
        }
    }

    /// Configure tracing from a string like `default=warn,rib=debug,all=info`.
    /// `default` sets the level of undeclared targets, `all` that of every declared target.
    /// Other items name tags and are applied last so that they can refine `all`.
    pub fn setup_from_string(&self, input: &str) -> Result<(), TraceCtlError> {
        let config = parse_tracing_config(input)?;
        if let Some(level) = config.get("default") {
            self.set_default_level(*level);
        }
        if let Some(level) = config.get("all") {
            self.set_level_all(*level);
        }
        config
            .iter()
            .filter(|(tag, _)| !matches!(tag.as_str(), "default" | "all"))
            .for_each(|(tag, level)| self.set_tag_level(tag, *level));
        Ok(())
    }

    #[must_use]
    pub fn get_tags(&self) -> Vec<String> {
        self.db().tags.keys().map(|t| (*t).to_owned()).collect()
    }
    #[must_use]
    pub fn get_target(&self, target: &str) -> Option<TargetCfg> {
        self.db().targets.get(target).cloned()
    }
    #[must_use]
    pub fn get_targets_by_tag(&self, tag: &str) -> Vec<TargetCfg> {
        self.db().tagged(tag).cloned().collect()
    }
    pub fn dump_targets_by_tag(&self) {
        let db = self.db();
        info!("{}", TargetsByTag(&db));
    }
    pub fn dump(&self) {
        let db = self.db();
        info!("{db}");
    }
    #[must_use]
    pub fn as_config_string(&self) -> String {
        self.db().as_config_string()
    }
}
