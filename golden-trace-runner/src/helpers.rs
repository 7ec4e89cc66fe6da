// Copyright (c) The golden-trace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::LazyLock;
use tracing::warn;

/// Gets the number of available CPUs and caches the value.
#[inline]
pub(crate) fn get_num_cpus() -> usize {
    static NUM_CPUS: LazyLock<usize> =
        LazyLock::new(|| match std::thread::available_parallelism() {
            Ok(count) => count.into(),
            Err(err) => {
                warn!("unable to determine num-cpus ({err}), assuming 1 logical CPU");
                1
            }
        });

    *NUM_CPUS
}

/// Utilities for pluralizing various words based on count or plurality.
pub(crate) mod plural {
    /// Returns "unit" if `count` is 1, otherwise "units".
    pub(crate) fn units_str(count: usize) -> &'static str {
        if count == 1 { "unit" } else { "units" }
    }

    /// Returns "file" if `count` is 1, otherwise "files".
    pub(crate) fn files_str(count: usize) -> &'static str {
        if count == 1 { "file" } else { "files" }
    }
}
