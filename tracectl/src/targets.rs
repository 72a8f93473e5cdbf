// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Link-time registry of tracing targets declared by the crates of the agent

use crate::LevelFilter;
use linkme::distributed_slice;

/// A tracing target as declared in code
#[derive(Debug)]
pub struct TargetDecl {
    pub(crate) target: &'static str,
    pub(crate) name: &'static str,
    pub(crate) level: LevelFilter,
    pub(crate) tags: &'static [&'static str],
    pub(crate) custom: bool,
}
impl TargetDecl {
    #[must_use]
    pub const fn module(
        target: &'static str,
        name: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
    ) -> Self {
        Self {
            target,
            name,
            level,
            tags,
            custom: false,
        }
    }
    #[must_use]
    pub const fn custom(
        target: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
    ) -> Self {
        Self {
            target,
            name: target,
            level,
            tags,
            custom: true,
        }
    }
}

#[distributed_slice]
pub static TRACE_TARGETS: [TargetDecl];

#[doc(hidden)]
#[macro_export]
macro_rules! __target_decl_deps {
    () => {
        use linkme::distributed_slice;
        use $crate::LevelFilter;
        use $crate::targets::{TRACE_TARGETS, TargetDecl};
    };
}

/// Declare the tracing target of the calling module with a name, a default level and tags.
/// The target is the module path of the caller.
#[macro_export]
macro_rules! trace_target {
    // Each expansion lives in its own anonymous const so that the static can always be
    // called the same and imports do not clash with those of the caller.
    ($name:expr, $level:expr, $tags:expr) => {
        const _: () = {
            $crate::__target_decl_deps!();

            #[distributed_slice(TRACE_TARGETS)]
            static DECL: TargetDecl = TargetDecl::module(module_path!(), $name, $level, $tags);
        };
    };
}

/// Declare a tracing target that does not match a module path (e.g. that of a dependency)
#[macro_export]
macro_rules! custom_target {
    ($target:expr, $level:expr, $tags:expr) => {
        const _: () = {
            $crate::__target_decl_deps!();

            #[distributed_slice(TRACE_TARGETS)]
            static DECL: TargetDecl = TargetDecl::custom($target, $level, $tags);
        };
    };
}
