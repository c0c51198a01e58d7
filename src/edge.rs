/// Identifies one observable cell in the runtime arenas.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct CellId(pub(crate) u64);

/// Identifies one observer (a registered reaction).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct ObserverId(pub(crate) u64);

/// Identifies one subscription edge.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct EdgeId(pub(crate) u64);

/// A subscription link between exactly one cell and one observer.
///
/// Edges live in the runtime's edge arena; both endpoints keep the
/// edge id in their own lists, so removing an edge always removes it
/// from both sides.
pub(crate) struct Edge {
	pub(crate) cell: CellId,
	pub(crate) observer: ObserverId,
}
