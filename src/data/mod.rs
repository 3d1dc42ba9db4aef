/// Data layer: cleaning, core types and queries.
///
/// Architecture:
/// ```text
///  .xlsx / .csv exports
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  file → RawTable (header offset, empty columns dropped)
///   └──────────┘
///        │
///        ▼
///   ┌──────────────────┐
///   │ customers / fees  │  clean cells → CustomerTable / FeeTable
///   └──────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  filter, top-N, group sums, series
///   └──────────┘
/// ```

pub mod clean;
pub mod customers;
pub mod fees;
pub mod filter;
pub mod loader;
pub mod model;
