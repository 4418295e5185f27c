/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

//! Test support for gridlink crates.
//!
//! ```ignore
//! use gridlink_test::prelude::*;
//!
//! #[gridlink_test]
//! async fn dispatches() -> anyhow::Result<()> {
//!     initialize_tracing();
//!     Ok(())
//! }
//! ```

use std::sync::Once;

use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

pub use gridlink_test_macro::gridlink_test;

/// Crates the `#[gridlink_test]` expansion refers to, so test crates need not
/// depend on them directly.
#[doc(hidden)]
pub mod reexports {
    pub use parking_lot;
    pub use tokio;
    pub use tracing;
}

pub mod prelude {
    pub use super::gridlink_test;
    pub use super::initialize_tracing;
}

static INIT: Once = Once::new();

/// Installs the shared test subscriber once per test binary.
///
/// Output goes to `gridlink_tests.txt` under the system temp directory. The
/// `RUST_LOG` variable overrides the default `gridlink=trace` filter.
pub fn initialize_tracing() {
    INIT.call_once(|| {
        let log_dir = std::env::temp_dir().join("gridlink-test-logs");
        if std::fs::create_dir_all(&log_dir).is_err() {
            return;
        }

        let file_appender = RollingFileAppender::new(Rotation::NEVER, &log_dir, "gridlink_tests.txt");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // Leaked so the writer outlives every test in the binary.
        Box::leak(Box::new(guard));

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,gridlink=trace,gridlink_core=trace"));

        let subscriber = FmtSubscriber::builder()
            .with_span_events(FmtSpan::NONE)
            .with_max_level(Level::TRACE)
            .compact()
            .with_line_number(true)
            .without_time()
            .with_target(true)
            .with_env_filter(filter)
            .with_writer(non_blocking)
            .finish();

        // Another subscriber may already be installed by the test harness.
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
