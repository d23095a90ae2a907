//! Concurrent recursive aggregation
//!
//! # Architecture
//!
//! ```text
//!                  ┌──────────────────────────┐
//!                  │         Scanner          │
//!                  │  - spawns root task      │
//!                  │  - stops sink at the end │
//!                  └────────────┬─────────────┘
//!                               │
//!            ┌──────────────────┼──────────────────┐
//!            │                  │                  │
//!      ┌─────▼─────┐      ┌─────▼─────┐      ┌─────▼─────┐
//!      │  task /a  │      │  task /b  │      │  task /c  │   one task per entry,
//!      │  (file)   │      │  (dir) ───┼──►   │  (dir) ───┼─► children merged on return
//!      └─────┬─────┘      └─────┬─────┘      └─────┬─────┘
//!            │   Limiter: at most K tasks hold a slot at once
//!            └──────────────────┼──────────────────┘
//!                               ▼
//!                  ┌──────────────────────────┐
//!                  │       BatchedSink        │
//!                  │  dirs + large files      │
//!                  └──────────────────────────┘
//! ```

pub mod aggregate;
pub mod coordinator;
pub mod ids;
pub mod limiter;

pub use aggregate::{visit, visit_root, ScanCounters, WalkContext};
pub use coordinator::{ScanReport, ScanStats, Scanner};
pub use ids::IdAllocator;
pub use limiter::{Limiter, Slot};
