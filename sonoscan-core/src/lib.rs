//! # Sonoscan Core
//!
//! Platform-independent logic for mechanically scanning sonars.
//!
//! This crate contains the pure algorithms of the driver with **zero I/O
//! dependencies**: everything here is `&[u8]` and arithmetic, suitable for
//! any platform.
//!
//! ## Architecture
//!
//! `sonoscan-core` is the shared foundation under `sonoscan-server`, which
//! adds the tokio transport, the device session and the scan worker:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  sonoscan-core (platform-independent, no tokio/async deps)  │
//! │  ├── scanner/     (beam angle state machine)                │
//! │  ├── transducer/  (timing calculator, firmware limits)      │
//! │  ├── sector/      (polar wedge rasterization)               │
//! │  ├── protocol/    (wire format parsing & formatting)        │
//! │  └── config/      (bounded parameters, atomic validation)   │
//! └─────────────────────────────────────────────────────────────┘
//!                               ▲
//!                  ┌────────────┴────────────┐
//!                  │  sonoscan-server        │
//!                  │  (tokio transport,      │
//!                  │   device session, node) │
//!                  └─────────────────────────┘
//! ```
//!
//! ## Key Modules
//!
//! - [`scanner`] - angle stepping with end-of-turn detection
//! - [`transducer`] - device settings derived from acoustic parameters
//! - [`sector`] - gap-free polar-to-Cartesian sector rasterization
//! - [`protocol`] - ping-protocol framing and sonar messages
//! - [`config`] - user-level configuration with bounds validation
//!
//! ## Example: One Sweep
//!
//! ```rust
//! use sonoscan_core::AngleScanner;
//!
//! let mut scanner = AngleScanner::default();
//! scanner.configure(0, 400, 20).unwrap();
//!
//! for _ in 0..scanner.angle_count() {
//!     let step = scanner.advance();
//!     // end_of_turn fires once, on the last interior step before the wrap
//!     if step.end_of_turn {
//!         assert_eq!(step.angle, 380);
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod protocol;
pub mod scanner;
pub mod sector;
pub mod transducer;

// Re-export commonly used types
pub use config::SonarConfig;
pub use error::{ConfigError, ParseError};
pub use protocol::{Frame, FrameAccumulator};
pub use scanner::{AngleScanner, AngleStep};
pub use sector::{SectorPoint, SectorRasterizer};
pub use transducer::{DeviceSettings, Transducer, TransmitDurationPolicy};
