//! Ordering of commit and invalidation for a single mutation.
//!
//! A mutation moves `Pending -> Committed -> Invalidated`. Each step consumes
//! the previous state, so cache keys can only be invalidated for a mutation
//! whose store-of-record statement has already returned successfully.
//! Invalidating first would let a concurrent reader repopulate the cache with
//! the pre-mutation row, and that entry would survive the commit.

use std::{
    marker::PhantomData,
    sync::atomic::{AtomicU64, Ordering},
};

static NEXT_MUTATION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    Pending,
    Committed,
    Invalidated,
}

#[derive(Debug)]
pub struct Pending;

#[derive(Debug)]
pub struct Committed;

#[derive(Debug)]
pub struct Invalidated;

pub trait State {
    const STATE: MutationState;
}

impl State for Pending {
    const STATE: MutationState = MutationState::Pending;
}

impl State for Committed {
    const STATE: MutationState = MutationState::Committed;
}

impl State for Invalidated {
    const STATE: MutationState = MutationState::Invalidated;
}

#[derive(Debug)]
pub struct Mutation<S> {
    id: u64,
    state: PhantomData<S>,
}

impl Mutation<Pending> {
    pub fn begin() -> Self {
        Self {
            id: NEXT_MUTATION_ID.fetch_add(1, Ordering::Relaxed),
            state: PhantomData,
        }
    }

    /// Marks the store-of-record statement as durable.
    pub fn commit(self) -> Mutation<Committed> {
        tracing::debug!(mutation = self.id, "committed");
        self.advance()
    }
}

impl Mutation<Committed> {
    pub fn invalidated(self) -> Mutation<Invalidated> {
        tracing::debug!(mutation = self.id, "invalidated");
        self.advance()
    }
}

impl<S: State> Mutation<S> {
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn state(&self) -> MutationState {
        S::STATE
    }

    fn advance<N>(self) -> Mutation<N> {
        Mutation {
            id: self.id,
            state: PhantomData,
        }
    }
}
