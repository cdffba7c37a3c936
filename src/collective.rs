//! The collective-communication seam of the parallel evaluator.
//!
//! The engine needs very little from its process group: a way to query the current rank
//! and the group size, a broadcast of the domain description from the coordinator to all
//! workers, and a sum-reduction of worker-local partial results back to the coordinator.
//! The [`Communicator`] trait captures exactly these operations, so the evaluator is
//! testable without a live process group. Two implementations are provided: a
//! [`SoloCommunicator`] for a group of one, and channel-backed [`GroupMember`]s created by
//! [`connect`] for running the group on threads of a single process.
//!
//! Broadcasts and reductions are blocking synchronization points: every member of the
//! group must eventually issue the matching collective call, in the same order, or the
//! group stalls. There is no timeout or cancellation.

use crossbeam::channel::{unbounded, Receiver, Sender};

/// The role of a worker within its group.
///
/// The coordinator owns the original input and output buffers, performs validation and
/// receives the reduced result; all other members hold no data until the broadcasts in the
/// compute phase.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    /// The single designated worker with rank 0.
    Coordinator,
    /// Any other member of the group.
    Worker,
}

/// The collective operations the parallel evaluator requires from its process group.
pub trait Communicator {
    /// Returns the rank of this member, in `[0, size)`.
    fn rank(&self) -> usize;

    /// Returns the number of members in the group.
    fn size(&self) -> usize;

    /// Returns the role of this member. Rank 0 is the coordinator.
    fn role(&self) -> Role {
        if self.rank() == 0 {
            Role::Coordinator
        } else {
            Role::Worker
        }
    }

    /// Broadcast a single index from the coordinator to all members. On the coordinator
    /// `value` is the source; on every other member it is overwritten.
    fn broadcast_index(&self, value: &mut usize);

    /// Broadcast a slice of indices from the coordinator to all members. The slice must
    /// already have the same length on every member.
    fn broadcast_indices(&self, values: &mut [usize]);

    /// Broadcast a slice of reals from the coordinator to all members. The slice must
    /// already have the same length on every member.
    fn broadcast_reals(&self, values: &mut [f64]);

    /// Combine `local` across all members by summation. Returns `Some` sum at the
    /// coordinator and `None` everywhere else.
    fn reduce_sum(&self, local: f64) -> Option<f64>;
}

/// A group of exactly one worker. Broadcasts are no-ops and the reduction returns the
/// local value unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct SoloCommunicator;

impl Communicator for SoloCommunicator {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn broadcast_index(&self, _: &mut usize) {}

    fn broadcast_indices(&self, _: &mut [usize]) {}

    fn broadcast_reals(&self, _: &mut [f64]) {}

    fn reduce_sum(&self, local: f64) -> Option<f64> {
        Some(local)
    }
}

/// A message travelling from the coordinator to a worker during a broadcast.
#[derive(Clone, Debug)]
enum Broadcast {
    Index(usize),
    Indices(Vec<usize>),
    Reals(Vec<f64>),
}

/// One member of an in-process group backed by channels.
///
/// Members are created together by [`connect`] and are meant to be moved onto one thread
/// each; every member then calls the same sequence of collective operations. Reductions
/// are combined in rank order, so the result is deterministic for a fixed group size.
#[derive(Debug)]
pub struct GroupMember {
    rank: usize,
    size: usize,
    /// Senders to every worker, in rank order. Non-empty only at the coordinator.
    bcast_tx: Vec<Sender<Broadcast>>,
    /// Receiving end of the coordinator's broadcasts. `None` at the coordinator.
    bcast_rx: Option<Receiver<Broadcast>>,
    /// Sender of this member's partial results. `None` at the coordinator.
    reduce_tx: Option<Sender<f64>>,
    /// Receivers of the workers' partial results, in rank order. Non-empty only at the
    /// coordinator.
    reduce_rx: Vec<Receiver<f64>>,
}

/// Create an in-process group of `size` members connected by channels. The member with
/// rank 0 is the coordinator; the returned vector is ordered by rank.
///
/// # Panics
///
/// Panics if `size` is zero.
pub fn connect(size: usize) -> Vec<GroupMember> {
    assert!(size > 0, "a group needs at least one member");

    let mut bcast_tx = Vec::with_capacity(size - 1);
    let mut reduce_rx = Vec::with_capacity(size - 1);
    let mut workers = Vec::with_capacity(size - 1);

    for rank in 1..size {
        let (b_tx, b_rx) = unbounded();
        let (r_tx, r_rx) = unbounded();

        bcast_tx.push(b_tx);
        reduce_rx.push(r_rx);
        workers.push(GroupMember {
            rank,
            size,
            bcast_tx: Vec::new(),
            bcast_rx: Some(b_rx),
            reduce_tx: Some(r_tx),
            reduce_rx: Vec::new(),
        });
    }

    let mut members = Vec::with_capacity(size);
    members.push(GroupMember {
        rank: 0,
        size,
        bcast_tx,
        bcast_rx: None,
        reduce_tx: None,
        reduce_rx,
    });
    members.extend(workers);

    members
}

impl GroupMember {
    fn send_to_all(&self, message: &Broadcast) {
        for tx in &self.bcast_tx {
            tx.send(message.clone())
                .expect("a group member hung up during a broadcast");
        }
    }

    fn receive(&self) -> Broadcast {
        self.bcast_rx
            .as_ref()
            .expect("only workers receive broadcasts")
            .recv()
            .expect("the coordinator hung up during a broadcast")
    }
}

impl Communicator for GroupMember {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn broadcast_index(&self, value: &mut usize) {
        if self.role() == Role::Coordinator {
            self.send_to_all(&Broadcast::Index(*value));
        } else if let Broadcast::Index(received) = self.receive() {
            *value = received;
        } else {
            unreachable!("broadcast sequence diverged between group members");
        }
    }

    fn broadcast_indices(&self, values: &mut [usize]) {
        if self.role() == Role::Coordinator {
            self.send_to_all(&Broadcast::Indices(values.to_vec()));
        } else if let Broadcast::Indices(received) = self.receive() {
            values.copy_from_slice(&received);
        } else {
            unreachable!("broadcast sequence diverged between group members");
        }
    }

    fn broadcast_reals(&self, values: &mut [f64]) {
        if self.role() == Role::Coordinator {
            self.send_to_all(&Broadcast::Reals(values.to_vec()));
        } else if let Broadcast::Reals(received) = self.receive() {
            values.copy_from_slice(&received);
        } else {
            unreachable!("broadcast sequence diverged between group members");
        }
    }

    fn reduce_sum(&self, local: f64) -> Option<f64> {
        if self.role() == Role::Coordinator {
            // combine in rank order so the result is deterministic
            let sum = self.reduce_rx.iter().fold(local, |acc, rx| {
                acc + rx.recv().expect("a group member hung up during a reduction")
            });

            Some(sum)
        } else {
            self.reduce_tx
                .as_ref()
                .expect("only workers send partial results")
                .send(local)
                .expect("the coordinator hung up during a reduction");

            None
        }
    }
}
