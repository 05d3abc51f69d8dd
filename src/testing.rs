//! Helpers for testing code that writes through the sink.
//!
//! - [`TempDirPath`]: a scratch directory with helpers to name and read output files
//! - [`SharedBuffer`]: an in-memory writer for passthrough output
//! - [`people_meta`] / [`people_rows`]: a small typed dataset
//!
//! ```
//! use ironsink::testing::*;
//! use ironsink::{Collaborators, OutputController, SinkConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let dir = TempDirPath::new()?;
//! let config = SinkConfig {
//!     filename: Some(dir.file("people")),
//!     ..SinkConfig::default()
//! };
//! let mut sink = OutputController::new(config, people_meta(), Collaborators::default())?;
//! sink.run(people_rows())?;
//! assert_eq!(dir.read_lines("people.txt")?.len(), 1 + people_rows().len());
//! # Ok(())
//! # }
//! ```

mod fixtures;
mod mock_io;

pub use fixtures::*;
pub use mock_io::*;
