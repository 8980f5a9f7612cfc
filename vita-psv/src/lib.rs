//! A library describing the layout of PlayStation Vita PSV game card dumps.
//!
//! A PSV file is a header followed by the raw game card image. The image
//! carries console-bound license data that can be stripped by zeroing a
//! handful of fixed regions. This crate knows where those regions are; it
//! does no file I/O of its own.
//!
//! # Example
//!
//! ```no_run
//! use vita_psv::{CopyPlan, PsvHeader, find_license};
//!
//! let bytes = std::fs::read("game.psv").unwrap();
//! let header = PsvHeader::read(&bytes).unwrap();
//! let license = find_license(&bytes).expect("no license in file");
//!
//! let plan = CopyPlan::new(bytes.len() as u64, header.header_len(), license).unwrap();
//! for segment in plan.segments() {
//!     println!("{} {:#X} bytes at {:#X}", segment.kind(), segment.len(), segment.input_offset());
//! }
//! ```
//!
//! # References
//!
//! - [PS Vita Developer Wiki - Game Card](https://www.psdevwiki.com/vita/Game_Card)

pub mod header;
pub mod license;
pub mod plan;

pub use self::header::PsvHeader;
pub use self::license::{LICENSE_MARKER, LicensePosition, find_license};
pub use self::plan::{CopyPlan, PlanError, Segment, SegmentKind};
