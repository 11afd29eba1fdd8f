use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::Utc;
use quorumtoken_approval::{
    ApprovalEvent, MultisigWallet, ProposalConfirmed, ProposalKind, WalletConfig, WalletEvent,
};
use quorumtoken_core::{AccountId, ExpectedVersion, ProposalId, WalletId};
use quorumtoken_events::{EventEnvelope, InMemoryEventBus};
use quorumtoken_infra::event_store::{EventStore, InMemoryEventStore, UncommittedEvent};
use quorumtoken_infra::wallet_service::WalletService;
use quorumtoken_ledger::{TokenLedger, TokenMetadata};
use std::sync::Arc;

type Bus = Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>>;

fn config(approvers: &[AccountId], quorum: u32) -> WalletConfig {
    WalletConfig {
        approvers: approvers.to_vec(),
        quorum,
        initial_supply: u64::MAX / 2,
        token: TokenMetadata::default(),
    }
}

fn bench_proposal_lifecycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("proposal_lifecycle");

    for quorum in [1u32, 3, 7] {
        group.bench_with_input(BenchmarkId::new("propose_confirm_execute", quorum), &quorum, |b, &q| {
            let approvers: Vec<AccountId> = (0..q).map(|_| AccountId::new()).collect();
            let service = WalletService::open(
                InMemoryEventStore::new(),
                Bus::default(),
                WalletId::new(),
                &config(&approvers, q),
            )
            .unwrap();
            let to = AccountId::new();

            b.iter(|| {
                let id = service
                    .propose(approvers[0], ProposalKind::Transfer { to, amount: black_box(1) })
                    .unwrap();
                for approver in &approvers {
                    service.confirm(*approver, id).unwrap();
                }
            });
        });
    }

    group.finish();
}

fn bench_rejected_confirm(c: &mut Criterion) {
    c.bench_function("rejected_duplicate_confirm", |b| {
        let approvers: Vec<AccountId> = (0..3).map(|_| AccountId::new()).collect();
        let service = WalletService::open(
            InMemoryEventStore::new(),
            Bus::default(),
            WalletId::new(),
            &config(&approvers, 3),
        )
        .unwrap();
        let id = service
            .propose(approvers[0], ProposalKind::Burn { from: approvers[0], amount: 1 })
            .unwrap();
        service.confirm(approvers[0], id).unwrap();

        b.iter(|| black_box(service.confirm(approvers[0], id).is_err()));
    });
}

fn bench_event_append_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_append_throughput");

    for batch_size in [1usize, 10, 100, 1000] {
        group.throughput(Throughput::Elements(batch_size as u64));
        group.bench_with_input(BenchmarkId::new("batch_append", batch_size), &batch_size, |b, &size| {
            let store = InMemoryEventStore::new();
            let wallet_id = WalletId::new();
            let approver = AccountId::new();

            b.iter(|| {
                let events: Vec<UncommittedEvent> = (0..size)
                    .map(|i| {
                        let event = WalletEvent::Approval(ApprovalEvent::ProposalConfirmed(ProposalConfirmed {
                            proposal_id: ProposalId::new(i as u64),
                            approver,
                            occurred_at: Utc::now(),
                        }));
                        UncommittedEvent::from_typed(wallet_id, uuid::Uuid::now_v7(), &event).unwrap()
                    })
                    .collect();

                black_box(store.append(events, ExpectedVersion::Any).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay");

    for proposals in [10usize, 100, 1000] {
        let approvers: Vec<AccountId> = (0..2).map(|_| AccountId::new()).collect();
        let wallet_id = WalletId::new();
        let cfg = config(&approvers, 2);
        let mut wallet = MultisigWallet::create(
            wallet_id,
            &cfg,
            TokenLedger::new(wallet_id, cfg.token.clone()),
            Utc::now(),
        )
        .unwrap();
        let to = AccountId::new();
        for _ in 0..proposals {
            let id = wallet
                .propose(approvers[0], ProposalKind::Transfer { to, amount: 1 }, Utc::now())
                .unwrap();
            wallet.confirm(approvers[0], id, Utc::now()).unwrap();
            wallet.confirm(approvers[1], id, Utc::now()).unwrap();
        }
        let history = wallet.take_uncommitted();

        group.throughput(Throughput::Elements(history.len() as u64));
        group.bench_with_input(BenchmarkId::new("from_history", proposals), &history, |b, history| {
            b.iter(|| {
                let ledger = TokenLedger::new(wallet_id, TokenMetadata::default());
                black_box(MultisigWallet::from_history(ledger, history.clone()).unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_proposal_lifecycle,
    bench_rejected_confirm,
    bench_event_append_throughput,
    bench_replay
);
criterion_main!(benches);
