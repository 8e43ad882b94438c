//! # Sonoscan Server
//!
//! Driver and scan server for mechanically scanning sonars.
//!
//! Built on top of [`sonoscan_core`] for the pure scanning logic, with
//! [`tokio`] providing the async runtime and transport.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                  sonoscan-server                       │
//! │  ┌───────────────┐   ┌─────────────────────────────┐   │
//! │  │ scan worker   │   │ image publisher (interval)  │   │
//! │  └───────┬───────┘   └──────────────┬──────────────┘   │
//! │          ▼                          ▼                  │
//! │  ┌────────────────────────────────────────────────┐    │
//! │  │        SonarNode (Arc<Mutex>)                  │    │
//! │  │  - SonarInterface (scanner+settings+buffer)    │    │
//! │  │  - SectorRasterizer + persistent image         │    │
//! │  │  - atomic reconfiguration                      │    │
//! │  │  - broadcast outputs (echo / scan / image)     │    │
//! │  └───────────────────────┬────────────────────────┘    │
//! │                          ▼                             │
//! │  ┌────────────────────────────────────────────────┐    │
//! │  │  SonarDevice: RealSonar over SonarLink<T>,     │    │
//! │  │  or EmulatedSonar (no hardware needed)         │    │
//! │  └────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency model
//!
//! One logical scan worker drives `advance -> read -> outputs` synchronously;
//! the real-device path blocks its task for up to 8000 ms per cycle. The
//! image publisher runs on its own cadence and only reads the image buffer.
//! Reconfiguration takes the same mutex as a scan cycle, so it can never
//! interleave with an in-flight read/rasterize pass.

pub mod device;
pub mod error;
pub mod node;
pub mod output;
pub mod sonar;
pub mod transport;

pub use device::{EmulatedSonar, RealSonar, SonarDevice};
pub use error::DeviceError;
pub use node::SonarNode;
pub use output::{EchoRecord, ImageFrame, RangingScan};
pub use sonar::{SonarInterface, SonarReading};
pub use transport::SonarLink;
