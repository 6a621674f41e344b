//! Reusable test utilities:
//! - Mock WordPress version-check and download server
//! - Fake export tools and table sources
//! - Test configuration builder

// Not every test binary uses every fixture
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fake_tools;
pub mod mock_version_api;
pub mod test_config;

pub use fake_tools::{FakeDumpTool, FixedTableSource};
pub use mock_version_api::MockVersionApi;
pub use test_config::TestConfigBuilder;
