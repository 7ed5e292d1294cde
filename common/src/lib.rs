//! Depot Zoning Common Library
//!
//! エリアの識別・照合・割当・選択履歴を扱うエンジン部分。
//! CLI（REPL）と描画側で共有する。

pub mod error;
pub mod keys;
pub mod canonical;
pub mod csv;
pub mod depot;
pub mod identity;
pub mod reconcile;
pub mod geojson;
pub mod scope;
pub mod collate;
pub mod catalog;
pub mod search;
pub mod assignment;
pub mod history;
pub mod brush;
pub mod schedule;
pub mod export;
pub mod zip_report;
pub mod session;

pub use error::{Error, Result};
pub use canonical::{canonical_municipality, canonical_town, normalize_match_key, normalize_postal};
pub use depot::{normalize_depot_code, DepotCode};
pub use identity::{resolve, FallbackSequence, Record, ResolvedIdentity};
pub use reconcile::{ReconciliationIndex, ReconciliationStats};
pub use scope::{InScopeSet, DEFAULT_IN_SCOPE_MUNICIPALITIES};
pub use catalog::{CatalogOptions, RegionVisibility, ZoneCatalog, ZoneMeta};
pub use search::NameSearchIndex;
pub use assignment::{AssignmentStats, AssignmentStore};
pub use history::{SelectionHistory, SelectionSnapshot};
pub use brush::{BrushOutcome, BrushSelector, BrushState};
pub use schedule::{DeferredKind, Generation, Ticket};
pub use export::{ChangeRow, ExportRow};
pub use zip_report::{AreaNameIndex, MatchStatus, ZipChangeRow};
pub use session::{DetailLevel, SessionOptions, StyleInputs, ZoneLabel, ZoningSession};
