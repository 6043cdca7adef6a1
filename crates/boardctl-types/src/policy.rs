/// How a task's incoming dependency edges are handled when the task they
/// point at is deleted. Resolves the Open Question in spec §9: the
/// original behavior nulls out the edge rather than rejecting the delete,
/// so `CascadeNull` is the default; `RejectIfReferenced` is kept as an
/// alternate policy should stricter boards want it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DependencyCleanupPolicy {
    #[default]
    CascadeNull,
    RejectIfReferenced,
}
