//! Several peers sharing one broadcast bus reach the same decision.

use agora_application::{
    AgoraConfig, AnnounceInput, AnnouncePresenceUseCase, AppContext, CastVoteInput,
    CastVoteUseCase, GovernanceQueries, IngestUseCase, KnowledgeStore, ProposeInput,
    ProposeUseCase,
};
use agora_domain::{AgentId, FactKey, GovernancePolicy, ProposalStatus, VoteValue};
use agora_infrastructure::{BroadcastTransport, BusMessage, JsonlOutboxTransport, LocalStore};
use std::sync::Arc;
use tokio::sync::broadcast::Receiver;

struct Peer {
    store: Arc<LocalStore>,
    ctx: AppContext,
}

impl Peer {
    fn new(agent: &str, bus: &BroadcastTransport) -> Self {
        let store = Arc::new(LocalStore::in_memory());
        let config = AgoraConfig::new(AgentId::new(agent), GovernancePolicy::default())
            .with_default_group("ops");
        let ctx = AppContext::new(store.clone(), store.clone(), Arc::new(bus.clone()), config);
        Self { store, ctx }
    }
}

/// Deliver everything on the bus to every peer
async fn pump(rx: &mut Receiver<BusMessage>, peers: &[&Peer]) -> usize {
    let mut delivered = 0;
    while let Ok(message) = rx.try_recv() {
        for peer in peers {
            IngestUseCase::new(peer.ctx.clone())
                .ingest_bytes(&message.payload)
                .await
                .unwrap();
        }
        delivered += 1;
    }
    delivered
}

#[tokio::test]
async fn test_peers_converge_on_approval() {
    let bus = BroadcastTransport::new();
    let mut rx = bus.subscribe();
    let lead = Peer::new("lead:1", &bus);
    let scout2 = Peer::new("scout:2", &bus);
    let scout3 = Peer::new("scout:3", &bus);
    let peers = [&lead, &scout2, &scout3];

    let proposal = ProposeUseCase::new(lead.ctx.clone())
        .execute(ProposeInput::new("deploy window", "Deploys happen on Tuesdays"))
        .await
        .unwrap()
        .proposal;
    assert_eq!(pump(&mut rx, &peers).await, 1);

    CastVoteUseCase::new(scout2.ctx.clone())
        .execute(CastVoteInput::new(proposal.id.clone(), VoteValue::Yes))
        .await
        .unwrap();
    assert_eq!(pump(&mut rx, &peers).await, 1);

    // the second vote reaches quorum on scout:3, which announces its fact and
    // the decision; the other two approve on ingest and announce the same fact
    let deciding = CastVoteUseCase::new(scout3.ctx.clone())
        .execute(CastVoteInput::new(proposal.id.clone(), VoteValue::Yes))
        .await
        .unwrap();
    assert_eq!(deciding.resolution.decision.status, ProposalStatus::Approved);
    assert_eq!(pump(&mut rx, &peers).await, 5);

    let key = FactKey::new("ops", "deploy window", "states");
    for peer in peers {
        let stored = peer.store.get_proposal(&proposal.id).await.unwrap();
        assert_eq!(stored.status, ProposalStatus::Approved);
        assert_eq!((stored.yes, stored.no), (2, 0));

        let fact = peer.store.get_fact_latest(&key).await.unwrap().unwrap();
        assert_eq!(fact.version, 1);
        assert_eq!(fact.object, "Deploys happen on Tuesdays");
        assert_eq!(fact.source, format!("decision:{}", proposal.id));
    }
}

#[tokio::test]
async fn test_proposer_vote_is_ignored_everywhere() {
    let bus = BroadcastTransport::new();
    let mut rx = bus.subscribe();
    let lead = Peer::new("lead:1", &bus);
    let scout2 = Peer::new("scout:2", &bus);
    let peers = [&lead, &scout2];

    let id = ProposeUseCase::new(lead.ctx.clone())
        .execute(ProposeInput::new("", "Water is wet"))
        .await
        .unwrap()
        .proposal
        .id;
    for peer in peers {
        CastVoteUseCase::new(peer.ctx.clone())
            .execute(CastVoteInput::new(id.clone(), VoteValue::Yes))
            .await
            .unwrap();
    }
    pump(&mut rx, &peers).await;

    for peer in peers {
        let stored = peer.store.get_proposal(&id).await.unwrap();
        assert_eq!(stored.status, ProposalStatus::Pending);
    }
}

#[tokio::test]
async fn test_presence_feeds_status_report() {
    let bus = BroadcastTransport::new();
    let mut rx = bus.subscribe();
    let lead = Peer::new("lead:1", &bus);
    let scout2 = Peer::new("scout:2", &bus);
    let peers = [&lead, &scout2];

    for peer in peers {
        AnnouncePresenceUseCase::new(peer.ctx.clone())
            .execute(AnnounceInput {
                group: None,
                capabilities: Some(vec!["review".into()]),
            })
            .await
            .unwrap();
    }
    pump(&mut rx, &peers).await;

    let report = GovernanceQueries::new(lead.ctx.clone())
        .status(None)
        .await
        .unwrap();
    assert_eq!(report.group, "ops");
    assert_eq!(report.members.len(), 2);
    assert_eq!(report.active_members, 2);
    assert!(
        report
            .members
            .iter()
            .all(|m| m.capabilities == vec!["review".to_string()])
    );
}

#[tokio::test]
async fn test_outbox_replays_into_another_node() {
    let dir = tempfile::tempdir().unwrap();
    let outbox_path = dir.path().join("outbox.jsonl");

    let outbox = Arc::new(JsonlOutboxTransport::open(&outbox_path).unwrap());
    let store = Arc::new(LocalStore::in_memory());
    let writer = AppContext::new(
        store.clone(),
        store,
        outbox,
        AgoraConfig::new(AgentId::new("lead:1"), GovernancePolicy::default()),
    );
    ProposeUseCase::new(writer.clone())
        .execute(ProposeInput::new("", "a").with_group("ops"))
        .await
        .unwrap();
    ProposeUseCase::new(writer)
        .execute(ProposeInput::new("", "b").with_group("ops"))
        .await
        .unwrap();

    let reader = Peer::new("scout:2", &BroadcastTransport::new());
    let content = std::fs::read_to_string(&outbox_path).unwrap();
    let ingest = IngestUseCase::new(reader.ctx.clone());

    let first = ingest.ingest_lines(&content).await;
    assert_eq!(first.applied, 2);
    assert!(first.rejected.is_empty());

    let second = ingest.ingest_lines(&content).await;
    assert_eq!(second.applied, 0);
    assert_eq!(second.replayed, 2);
    assert_eq!(
        reader.store.list_proposals(Some("ops"), None).await.unwrap().len(),
        2
    );
}
