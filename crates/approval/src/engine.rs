use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quorumtoken_core::{AccountId, Aggregate, AggregateRoot, ProposalId, WalletId};
use quorumtoken_events::Event;

use crate::approvers::ApproverSet;
use crate::error::ApprovalError;
use crate::proposal::{Proposal, ProposalKind};

/// Aggregate root: the proposal lifecycle of one wallet.
///
/// Decides propose → confirm* → execute (or revoke) transitions. It does not
/// touch the ledger; a `ProposalExecuted` event is the signal for the caller
/// to perform the ledger operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalEngine {
    id: WalletId,
    approvers: ApproverSet,
    proposals: BTreeMap<ProposalId, Proposal>,
    next_id: ProposalId,
    version: u64,
}

impl ApprovalEngine {
    pub fn new(id: WalletId, approvers: ApproverSet) -> Self {
        Self {
            id,
            approvers,
            proposals: BTreeMap::new(),
            next_id: ProposalId::FIRST,
            version: 0,
        }
    }

    pub fn approvers(&self) -> &ApproverSet {
        &self.approvers
    }

    pub fn proposal(&self, id: ProposalId) -> Result<&Proposal, ApprovalError> {
        self.proposals.get(&id).ok_or(ApprovalError::NotFound(id))
    }

    /// All proposals in id order, executed ones included.
    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.values()
    }

    pub fn proposal_count(&self) -> usize {
        self.proposals.len()
    }

    /// Id the next submission will receive.
    pub fn next_id(&self) -> ProposalId {
        self.next_id
    }
}

impl AggregateRoot for ApprovalEngine {
    type Id = WalletId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: submit a new proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Propose {
    pub caller: AccountId,
    pub kind: ProposalKind,
    pub occurred_at: DateTime<Utc>,
}

/// Command: add the caller's confirmation (auto-executes on quorum).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirm {
    pub caller: AccountId,
    pub proposal_id: ProposalId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: execute a proposal that already has quorum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execute {
    pub caller: AccountId,
    pub proposal_id: ProposalId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: withdraw the caller's confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revoke {
    pub caller: AccountId,
    pub proposal_id: ProposalId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalCommand {
    Propose(Propose),
    Confirm(Confirm),
    Execute(Execute),
    Revoke(Revoke),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalSubmitted {
    pub proposal_id: ProposalId,
    pub proposer: AccountId,
    pub kind: ProposalKind,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalConfirmed {
    pub proposal_id: ProposalId,
    pub approver: AccountId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalExecuted {
    pub proposal_id: ProposalId,
    pub executor: AccountId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationRevoked {
    pub proposal_id: ProposalId,
    pub approver: AccountId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalEvent {
    ProposalSubmitted(ProposalSubmitted),
    ProposalConfirmed(ProposalConfirmed),
    ProposalExecuted(ProposalExecuted),
    ConfirmationRevoked(ConfirmationRevoked),
}

impl ApprovalEvent {
    pub fn proposal_id(&self) -> ProposalId {
        match self {
            ApprovalEvent::ProposalSubmitted(e) => e.proposal_id,
            ApprovalEvent::ProposalConfirmed(e) => e.proposal_id,
            ApprovalEvent::ProposalExecuted(e) => e.proposal_id,
            ApprovalEvent::ConfirmationRevoked(e) => e.proposal_id,
        }
    }
}

impl Event for ApprovalEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ApprovalEvent::ProposalSubmitted(_) => "approval.proposal.submitted",
            ApprovalEvent::ProposalConfirmed(_) => "approval.proposal.confirmed",
            ApprovalEvent::ProposalExecuted(_) => "approval.proposal.executed",
            ApprovalEvent::ConfirmationRevoked(_) => "approval.proposal.revoked",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ApprovalEvent::ProposalSubmitted(e) => e.occurred_at,
            ApprovalEvent::ProposalConfirmed(e) => e.occurred_at,
            ApprovalEvent::ProposalExecuted(e) => e.occurred_at,
            ApprovalEvent::ConfirmationRevoked(e) => e.occurred_at,
        }
    }
}

impl Aggregate for ApprovalEngine {
    type Command = ApprovalCommand;
    type Event = ApprovalEvent;
    type Error = ApprovalError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ApprovalEvent::ProposalSubmitted(e) => {
                self.proposals.insert(
                    e.proposal_id,
                    Proposal::new(e.proposal_id, e.proposer, e.kind.clone(), e.occurred_at),
                );
                if let Some(next) = e.proposal_id.next().filter(|next| *next > self.next_id) {
                    self.next_id = next;
                }
            }
            ApprovalEvent::ProposalConfirmed(e) => {
                if let Some(p) = self.proposals.get_mut(&e.proposal_id) {
                    p.confirmations.insert(e.approver);
                }
            }
            ApprovalEvent::ProposalExecuted(e) => {
                if let Some(p) = self.proposals.get_mut(&e.proposal_id) {
                    p.executed = true;
                }
            }
            ApprovalEvent::ConfirmationRevoked(e) => {
                if let Some(p) = self.proposals.get_mut(&e.proposal_id) {
                    p.confirmations.remove(&e.approver);
                }
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ApprovalCommand::Propose(cmd) => self.handle_propose(cmd),
            ApprovalCommand::Confirm(cmd) => self.handle_confirm(cmd),
            ApprovalCommand::Execute(cmd) => self.handle_execute(cmd),
            ApprovalCommand::Revoke(cmd) => self.handle_revoke(cmd),
        }
    }
}

impl ApprovalEngine {
    fn ensure_approver(&self, caller: AccountId) -> Result<(), ApprovalError> {
        if !self.approvers.contains(&caller) {
            return Err(ApprovalError::NotAuthorized(caller));
        }
        Ok(())
    }

    fn ensure_pending(proposal: &Proposal) -> Result<(), ApprovalError> {
        if proposal.executed {
            return Err(ApprovalError::AlreadyExecuted(proposal.id));
        }
        Ok(())
    }

    fn handle_propose(&self, cmd: &Propose) -> Result<Vec<ApprovalEvent>, ApprovalError> {
        self.ensure_approver(cmd.caller)?;

        Ok(vec![ApprovalEvent::ProposalSubmitted(ProposalSubmitted {
            proposal_id: self.next_id,
            proposer: cmd.caller,
            kind: cmd.kind.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_confirm(&self, cmd: &Confirm) -> Result<Vec<ApprovalEvent>, ApprovalError> {
        let proposal = self.proposal(cmd.proposal_id)?;
        self.ensure_approver(cmd.caller)?;
        Self::ensure_pending(proposal)?;
        if proposal.has_confirmed(&cmd.caller) {
            return Err(ApprovalError::AlreadyConfirmed {
                proposal_id: proposal.id,
                approver: cmd.caller,
            });
        }

        let mut events = vec![ApprovalEvent::ProposalConfirmed(ProposalConfirmed {
            proposal_id: proposal.id,
            approver: cmd.caller,
            occurred_at: cmd.occurred_at,
        })];

        // Reaching quorum executes in the same decision, attributed to the
        // confirming approver.
        if self.approvers.is_met(proposal.confirmation_count() + 1) {
            events.push(ApprovalEvent::ProposalExecuted(ProposalExecuted {
                proposal_id: proposal.id,
                executor: cmd.caller,
                occurred_at: cmd.occurred_at,
            }));
        }

        Ok(events)
    }

    fn handle_execute(&self, cmd: &Execute) -> Result<Vec<ApprovalEvent>, ApprovalError> {
        let proposal = self.proposal(cmd.proposal_id)?;
        self.ensure_approver(cmd.caller)?;
        Self::ensure_pending(proposal)?;
        if !self.approvers.is_met(proposal.confirmation_count()) {
            return Err(ApprovalError::QuorumNotMet {
                proposal_id: proposal.id,
                confirmations: proposal.confirmation_count(),
                quorum: self.approvers.quorum(),
            });
        }

        Ok(vec![ApprovalEvent::ProposalExecuted(ProposalExecuted {
            proposal_id: proposal.id,
            executor: cmd.caller,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_revoke(&self, cmd: &Revoke) -> Result<Vec<ApprovalEvent>, ApprovalError> {
        let proposal = self.proposal(cmd.proposal_id)?;
        self.ensure_approver(cmd.caller)?;
        Self::ensure_pending(proposal)?;
        if !proposal.has_confirmed(&cmd.caller) {
            return Err(ApprovalError::NotConfirmed {
                proposal_id: proposal.id,
                approver: cmd.caller,
            });
        }

        Ok(vec![ApprovalEvent::ConfirmationRevoked(ConfirmationRevoked {
            proposal_id: proposal.id,
            approver: cmd.caller,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use quorumtoken_core::execute;

    struct Fixture {
        engine: ApprovalEngine,
        a: AccountId,
        b: AccountId,
        c: AccountId,
    }

    fn fixture(quorum: u32) -> Fixture {
        let (a, b, c) = (AccountId::new(), AccountId::new(), AccountId::new());
        let approvers = ApproverSet::new(vec![a, b, c], quorum).unwrap();
        Fixture {
            engine: ApprovalEngine::new(WalletId::new(), approvers),
            a,
            b,
            c,
        }
    }

    fn propose(engine: &mut ApprovalEngine, caller: AccountId) -> Result<ProposalId, ApprovalError> {
        let events = execute(
            engine,
            &ApprovalCommand::Propose(Propose {
                caller,
                kind: ProposalKind::Transfer { to: AccountId::new(), amount: 100 },
                occurred_at: Utc::now(),
            }),
        )?;
        Ok(events[0].proposal_id())
    }

    fn confirm(
        engine: &mut ApprovalEngine,
        caller: AccountId,
        id: ProposalId,
    ) -> Result<Vec<ApprovalEvent>, ApprovalError> {
        execute(
            engine,
            &ApprovalCommand::Confirm(Confirm { caller, proposal_id: id, occurred_at: Utc::now() }),
        )
    }

    fn revoke(
        engine: &mut ApprovalEngine,
        caller: AccountId,
        id: ProposalId,
    ) -> Result<Vec<ApprovalEvent>, ApprovalError> {
        execute(
            engine,
            &ApprovalCommand::Revoke(Revoke { caller, proposal_id: id, occurred_at: Utc::now() }),
        )
    }

    fn exec(
        engine: &mut ApprovalEngine,
        caller: AccountId,
        id: ProposalId,
    ) -> Result<Vec<ApprovalEvent>, ApprovalError> {
        execute(
            engine,
            &ApprovalCommand::Execute(Execute { caller, proposal_id: id, occurred_at: Utc::now() }),
        )
    }

    #[test]
    fn proposal_ids_are_sequential_from_zero() {
        let Fixture { mut engine, a, b, .. } = fixture(2);
        assert_eq!(propose(&mut engine, a).unwrap(), ProposalId::new(0));
        assert_eq!(propose(&mut engine, b).unwrap(), ProposalId::new(1));
        assert_eq!(engine.proposal_count(), 2);
        assert_eq!(engine.next_id(), ProposalId::new(2));
    }

    #[test]
    fn non_approver_cannot_propose() {
        let Fixture { mut engine, .. } = fixture(2);
        let outsider = AccountId::new();

        let err = propose(&mut engine, outsider).unwrap_err();

        assert_eq!(err, ApprovalError::NotAuthorized(outsider));
        assert_eq!(engine.next_id(), ProposalId::FIRST);
        assert_eq!(engine.proposal_count(), 0);
        assert_eq!(engine.version(), 0);
    }

    #[test]
    fn confirm_below_quorum_stays_pending() {
        let Fixture { mut engine, a, b, .. } = fixture(2);
        let id = propose(&mut engine, a).unwrap();

        let events = confirm(&mut engine, b, id).unwrap();

        assert_eq!(events.len(), 1);
        let p = engine.proposal(id).unwrap();
        assert!(p.has_confirmed(&b));
        assert!(!p.is_executed());
    }

    #[test]
    fn reaching_quorum_executes_in_the_same_step() {
        let Fixture { mut engine, a, b, .. } = fixture(2);
        let id = propose(&mut engine, a).unwrap();
        confirm(&mut engine, b, id).unwrap();

        let events = confirm(&mut engine, a, id).unwrap();

        assert_eq!(events.len(), 2);
        match &events[1] {
            ApprovalEvent::ProposalExecuted(e) => {
                assert_eq!(e.proposal_id, id);
                assert_eq!(e.executor, a);
            }
            other => panic!("expected execution, got {other:?}"),
        }
        let p = engine.proposal(id).unwrap();
        assert!(p.is_executed());
        assert_eq!(p.confirmation_count(), 2);
    }

    #[test]
    fn quorum_of_one_executes_on_first_confirmation() {
        let Fixture { mut engine, a, .. } = fixture(1);
        let id = propose(&mut engine, a).unwrap();
        let events = confirm(&mut engine, a, id).unwrap();
        assert!(matches!(events.last(), Some(ApprovalEvent::ProposalExecuted(_))));
    }

    #[test]
    fn double_confirmation_is_rejected_without_change() {
        let Fixture { mut engine, a, b, .. } = fixture(3);
        let id = propose(&mut engine, a).unwrap();
        confirm(&mut engine, b, id).unwrap();
        let before = engine.clone();

        let err = confirm(&mut engine, b, id).unwrap_err();

        assert_eq!(err, ApprovalError::AlreadyConfirmed { proposal_id: id, approver: b });
        assert_eq!(engine, before);
    }

    #[test]
    fn confirm_checks_existence_before_authorization() {
        let Fixture { mut engine, .. } = fixture(2);
        let outsider = AccountId::new();
        let missing = ProposalId::new(9);

        assert_eq!(confirm(&mut engine, outsider, missing).unwrap_err(), ApprovalError::NotFound(missing));
    }

    #[test]
    fn outsider_cannot_confirm_existing_proposal() {
        let Fixture { mut engine, a, .. } = fixture(2);
        let id = propose(&mut engine, a).unwrap();
        let outsider = AccountId::new();

        assert_eq!(confirm(&mut engine, outsider, id).unwrap_err(), ApprovalError::NotAuthorized(outsider));
    }

    #[test]
    fn late_confirmation_after_execution_fails() {
        let Fixture { mut engine, a, b, c } = fixture(2);
        let id = propose(&mut engine, a).unwrap();
        confirm(&mut engine, b, id).unwrap();
        confirm(&mut engine, a, id).unwrap();

        assert_eq!(confirm(&mut engine, c, id).unwrap_err(), ApprovalError::AlreadyExecuted(id));
    }

    #[test]
    fn executed_proposal_rejects_every_mutation() {
        let Fixture { mut engine, a, b, .. } = fixture(2);
        let id = propose(&mut engine, a).unwrap();
        confirm(&mut engine, a, id).unwrap();
        confirm(&mut engine, b, id).unwrap();
        let before = engine.clone();

        assert_eq!(exec(&mut engine, a, id).unwrap_err(), ApprovalError::AlreadyExecuted(id));
        assert_eq!(revoke(&mut engine, b, id).unwrap_err(), ApprovalError::AlreadyExecuted(id));
        assert_eq!(engine, before);
    }

    #[test]
    fn revoke_then_single_confirmation_does_not_execute() {
        let Fixture { mut engine, a, b, .. } = fixture(2);
        let id = propose(&mut engine, a).unwrap();
        confirm(&mut engine, a, id).unwrap();
        revoke(&mut engine, a, id).unwrap();
        assert_eq!(engine.proposal(id).unwrap().confirmation_count(), 0);

        confirm(&mut engine, b, id).unwrap();

        let p = engine.proposal(id).unwrap();
        assert_eq!(p.confirmation_count(), 1);
        assert!(!p.is_executed());
    }

    #[test]
    fn revoke_without_confirmation_fails() {
        let Fixture { mut engine, a, b, .. } = fixture(2);
        let id = propose(&mut engine, a).unwrap();

        assert_eq!(
            revoke(&mut engine, b, id).unwrap_err(),
            ApprovalError::NotConfirmed { proposal_id: id, approver: b }
        );
    }

    #[test]
    fn direct_execute_requires_quorum() {
        let Fixture { mut engine, a, b, .. } = fixture(2);
        let id = propose(&mut engine, a).unwrap();
        confirm(&mut engine, b, id).unwrap();

        assert_eq!(
            exec(&mut engine, a, id).unwrap_err(),
            ApprovalError::QuorumNotMet { proposal_id: id, confirmations: 1, quorum: 2 }
        );
    }

    #[test]
    fn unknown_ids_are_not_found_everywhere() {
        let Fixture { mut engine, a, .. } = fixture(2);
        let missing = ProposalId::new(3);
        assert_eq!(engine.proposal(missing).unwrap_err(), ApprovalError::NotFound(missing));
        assert_eq!(exec(&mut engine, a, missing).unwrap_err(), ApprovalError::NotFound(missing));
        assert_eq!(revoke(&mut engine, a, missing).unwrap_err(), ApprovalError::NotFound(missing));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Propose(usize),
        Confirm(usize, u64),
        Revoke(usize, u64),
        Execute(usize, u64),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        // Index 3 is an outsider.
        prop_oneof![
            (0usize..4).prop_map(Op::Propose),
            (0usize..4, 0u64..4).prop_map(|(c, id)| Op::Confirm(c, id)),
            (0usize..4, 0u64..4).prop_map(|(c, id)| Op::Revoke(c, id)),
            (0usize..4, 0u64..4).prop_map(|(c, id)| Op::Execute(c, id)),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: under any interleaving of operations, confirmations
        /// stay a subset of the approvers, executed proposals had quorum and
        /// never change again.
        #[test]
        fn lifecycle_invariants_hold(
            quorum in 1u32..=3,
            ops in prop::collection::vec(op_strategy(), 1..60)
        ) {
            let callers = [AccountId::new(), AccountId::new(), AccountId::new(), AccountId::new()];
            let approvers = ApproverSet::new(callers[..3].to_vec(), quorum).unwrap();
            let mut engine = ApprovalEngine::new(WalletId::new(), approvers);

            for op in ops {
                let before = engine.clone();
                let result = match op {
                    Op::Propose(c) => propose(&mut engine, callers[c]).map(|_| ()),
                    Op::Confirm(c, id) => confirm(&mut engine, callers[c], ProposalId::new(id)).map(|_| ()),
                    Op::Revoke(c, id) => revoke(&mut engine, callers[c], ProposalId::new(id)).map(|_| ()),
                    Op::Execute(c, id) => exec(&mut engine, callers[c], ProposalId::new(id)).map(|_| ()),
                };

                if result.is_err() {
                    prop_assert_eq!(&engine, &before);
                }

                for p in engine.proposals() {
                    prop_assert!(p.confirmation_count() <= 3);
                    prop_assert!(p.confirmations().all(|a| engine.approvers().contains(a)));
                    if p.is_executed() {
                        prop_assert!(p.confirmation_count() >= quorum as usize);
                    }
                    if let Ok(old) = before.proposal(p.id()) {
                        if old.is_executed() {
                            prop_assert_eq!(old, p);
                        }
                    }
                }
            }
        }
    }
}
