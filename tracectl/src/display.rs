// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Display implementations

use crate::control::{TargetCfg, TargetCfgDb};
use std::fmt::{Display, Formatter, Result};

const TARGET_WIDTH: usize = 48;

impl Display for TargetCfg {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(
            f,
            " {:>TARGET_WIDTH$} │ {:>6} │ {}{}",
            self.target,
            self.level.to_string(),
            self.tags.join(","),
            if self.custom { " (custom)" } else { "" }
        )
    }
}

impl Display for TargetCfgDb {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f)?;
        writeln!(f, " ──────── Tracing targets ────────")?;
        writeln!(f, " {:>TARGET_WIDTH$} │ {:>6} │ TAGS", "TARGET", "LEVEL")?;
        for cfg in self.targets.values() {
            writeln!(f, "{cfg}")?;
        }
        write!(
            f,
            " {:>TARGET_WIDTH$} │ {:>6} │ --",
            "(default)",
            self.level.to_string()
        )
    }
}

/// Shows the targets of a [`TargetCfgDb`] grouped by tag
pub(crate) struct TargetsByTag<'a>(pub(crate) &'a TargetCfgDb);
impl Display for TargetsByTag<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let db = self.0;
        writeln!(f)?;
        writeln!(f, " ──────── Tracing targets by tag ────────")?;
        for tag in db.tags.keys() {
            writeln!(f, " {tag}:")?;
            for cfg in db.tagged(tag) {
                writeln!(f, "    {:<TARGET_WIDTH$} : {}", cfg.target, cfg.level)?;
            }
        }
        Ok(())
    }
}
