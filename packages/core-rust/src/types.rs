/// A single semi-structured record as returned by a store.
///
/// The engine treats documents as opaque payloads; only registered document
/// validators look inside them.
pub type Document = serde_json::Value;

/// Name of the identity index every collection carries implicitly.
pub const ID_INDEX_NAME: &str = "_id_";

/// Field covered by the implicit identity index.
pub const ID_FIELD: &str = "_id";
