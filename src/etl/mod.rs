/// ETL Pipeline Module
///
/// This module holds the building blocks of the load:
/// - Extract: Read tab-separated records from the IMDb exports
/// - Parsers: Turn positional records into typed rows
/// - Resolve: Map natural keys to the store's surrogate keys
/// - Load: Buffer rows and write them in atomic batches
/// - Stages: One loader per entity or relationship kind
pub mod extract;
pub mod load;
pub mod parsers;
pub mod resolve;
pub mod stages;
