//! Lens module
//!
//! Lenses combine database access with output formatting, so the same views
//! can back the CLI or be embedded by other front ends.
//!
//! | Lens | Purpose |
//! |------|---------|
//! | `StatusLens` | database file, connection state, per-table row/column counts |
//! | `EmbedLens` | expand `[[sqlt("name")]]` markers into rendered tables |
//!
//! # Usage
//!
//! ```rust,ignore
//! use sqlt::lens::status::StatusLens;
//! use sqlt::lens::embed::EmbedLens;
//! use sqlt::lens::utils::OutputFormat;
//!
//! let lens = StatusLens::new(&manager);
//! let status = lens.status()?;
//! println!("{}", lens.format_status(&status, OutputFormat::Markdown));
//!
//! let page = EmbedLens::new(&manager)?.render(&document);
//! ```

pub mod utils;

pub mod embed;
pub mod status;
