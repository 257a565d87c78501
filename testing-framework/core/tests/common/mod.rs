//! In-process stand-in for miners, sharders and the block worker.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use testing_framework_core::{
    crypto,
    models::{
        Allocation, AllocationBlobber, ClientRegistration, NewAllocationRequest, StorageNode,
        Tokens, Transaction,
    },
    nodes::paths,
};
use tokio::net::TcpListener;

#[derive(Default)]
pub struct Ledger {
    pub registered: HashMap<String, String>,
    pub balances: HashMap<String, (Tokens, i64)>,
    pub transactions: HashMap<String, (Transaction, i32, String)>,
    pub allocations: HashMap<String, Allocation>,
    pub blobbers: Vec<StorageNode>,
}

#[derive(Clone)]
struct Stub {
    ledger: Arc<Mutex<Ledger>>,
    base: String,
}

pub struct StubNetwork {
    pub addr: SocketAddr,
    pub ledger: Arc<Mutex<Ledger>>,
}

impl StubNetwork {
    pub fn miners(&self) -> Vec<String> {
        vec![format!("http://{}/miner01", self.addr)]
    }

    pub fn sharders(&self) -> Vec<String> {
        vec![format!("http://{}/sharder01", self.addr)]
    }

    pub fn block_worker(&self) -> String {
        format!("http://{}/dns", self.addr)
    }

    /// A node URL that refuses every call.
    pub fn dead_node(&self) -> String {
        format!("http://{}/offline", self.addr)
    }
}

pub async fn spawn_stub_network(blobbers: usize) -> StubNetwork {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let ledger = Arc::new(Mutex::new(Ledger {
        blobbers: (0..blobbers)
            .map(|i| StorageNode {
                id: format!("blobber-{i}"),
                url: format!("http://{addr}/blobber{i}"),
                capacity: 1 << 40,
                ..StorageNode::default()
            })
            .collect(),
        ..Ledger::default()
    }));
    let stub = Stub {
        ledger: Arc::clone(&ledger),
        base: format!("http://{addr}"),
    };

    let node = Router::new()
        .route(paths::CLIENT_PUT, post(register))
        .route(paths::CLIENT_BALANCE, get(balance))
        .route(paths::TRANSACTION_PUT, post(submit))
        .route(paths::TRANSACTION_CONFIRMATION, get(confirmation))
        .route("/v1/screst/:sc/:endpoint", get(sc_rest));

    let app = Router::new()
        .nest("/miner01", node.clone())
        .nest("/sharder01", node)
        .route("/dns/network", get(network))
        .route("/offline/*rest", get(offline).post(offline))
        .with_state(stub);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StubNetwork { addr, ledger }
}

fn client_error(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

async fn offline() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, "node offline").into_response()
}

async fn network(State(stub): State<Stub>) -> Json<Value> {
    Json(json!({
        "miners": [format!("{}/miner01", stub.base)],
        "sharders": [format!("{}/sharder01", stub.base)],
    }))
}

async fn register(State(stub): State<Stub>, Json(body): Json<ClientRegistration>) -> Response {
    match crypto::client_id(&body.public_key) {
        Ok(id) if id == body.id && body.public_key.len() == 64 => {
            stub.ledger
                .lock()
                .unwrap()
                .registered
                .insert(body.id.clone(), body.public_key.clone());
            Json(json!({ "id": body.id, "public_key": body.public_key, "version": "1.0" }))
                .into_response()
        }
        _ => client_error("invalid public key"),
    }
}

async fn balance(
    State(stub): State<Stub>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let ledger = stub.ledger.lock().unwrap();
    match query
        .get("client_id")
        .and_then(|id| ledger.balances.get(id))
    {
        Some((balance, nonce)) => Json(json!({
            "txn": "",
            "round": 1,
            "balance": balance,
            "nonce": nonce,
        }))
        .into_response(),
        None => client_error("value not present"),
    }
}

#[derive(Deserialize)]
struct ScCall {
    name: String,
    input: Value,
}

async fn submit(State(stub): State<Stub>, Json(txn): Json<Transaction>) -> Response {
    let expected_hash = crypto::transaction_hash(
        txn.creation_date,
        txn.transaction_nonce,
        &txn.client_id,
        &txn.to_client_id,
        txn.transaction_value.units(),
        &txn.transaction_data,
    );
    if expected_hash != txn.hash {
        return client_error("hash mismatch");
    }
    if !crypto::verify(&txn.public_key, &txn.hash, &txn.signature).unwrap_or(false) {
        return client_error("invalid signature");
    }

    let mut ledger = stub.ledger.lock().unwrap();
    let expected_nonce = ledger
        .balances
        .get(&txn.client_id)
        .map_or(1, |(_, nonce)| nonce + 1);
    if txn.transaction_nonce != expected_nonce {
        return client_error("invalid nonce");
    }

    let (status, output) = apply(&mut ledger, &txn);
    ledger
        .transactions
        .insert(txn.hash.clone(), (txn.clone(), status, output));

    Json(json!({ "async": true, "entity": { "hash": txn.hash } })).into_response()
}

fn apply(ledger: &mut Ledger, txn: &Transaction) -> (i32, String) {
    let Ok(call) = serde_json::from_str::<ScCall>(&txn.transaction_data) else {
        return (2, "malformed smart contract call".to_owned());
    };

    let entry = ledger
        .balances
        .entry(txn.client_id.clone())
        .or_insert((Tokens::ZERO, 0));
    entry.1 = txn.transaction_nonce;

    match (txn.to_client_id.as_str(), call.name.as_str()) {
        (paths::FAUCET_SC_ADDRESS, "pour") if txn.transaction_value.units() > 0 => {
            entry.0 = entry.0 + txn.transaction_value;
            (1, "poured".to_owned())
        }
        (paths::FAUCET_SC_ADDRESS, "pour") => (2, "pour amount must be positive".to_owned()),
        (paths::STORAGE_SC_ADDRESS, "new_allocation_request") => {
            let Ok(request) = serde_json::from_value::<NewAllocationRequest>(call.input) else {
                return (2, "malformed allocation request".to_owned());
            };
            if txn.transaction_value.units() <= 0 || entry.0 < txn.transaction_value {
                return (2, "not enough tokens to honor the min lock demand".to_owned());
            }
            entry.0 = Tokens(entry.0.units() - txn.transaction_value.units());
            ledger.allocations.insert(
                txn.hash.clone(),
                Allocation {
                    id: txn.hash.clone(),
                    tx: txn.hash.clone(),
                    data_shards: request.data_shards,
                    parity_shards: request.parity_shards,
                    size: request.size,
                    owner_id: request.owner_id,
                    owner_public_key: request.owner_public_key,
                    blobbers: request
                        .blobbers
                        .into_iter()
                        .map(|blobber_id| AllocationBlobber {
                            blobber_id,
                            url: String::new(),
                        })
                        .collect(),
                    ..Allocation::default()
                },
            );
            (1, "allocation created".to_owned())
        }
        _ => (2, "unknown smart contract call".to_owned()),
    }
}

async fn confirmation(
    State(stub): State<Stub>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let ledger = stub.ledger.lock().unwrap();
    match query
        .get("hash")
        .and_then(|hash| ledger.transactions.get(hash))
    {
        Some((txn, status, output)) => Json(json!({
            "version": "1.0",
            "hash": txn.hash,
            "block_hash": "block",
            "round": 2,
            "txn": {
                "hash": txn.hash,
                "client_id": txn.client_id,
                "to_client_id": txn.to_client_id,
                "transaction_value": txn.transaction_value,
                "transaction_status": status,
                "transaction_output": output,
            }
        }))
        .into_response(),
        None => client_error("entity not found"),
    }
}

async fn sc_rest(
    State(stub): State<Stub>,
    Path((sc, endpoint)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if sc != paths::STORAGE_SC_ADDRESS {
        return client_error("unknown smart contract");
    }
    let ledger = stub.ledger.lock().unwrap();
    match endpoint.as_str() {
        paths::GET_BLOBBERS => Json(json!({ "Nodes": ledger.blobbers })).into_response(),
        paths::ALLOCATION => match query
            .get("allocation")
            .and_then(|id| ledger.allocations.get(id))
        {
            Some(allocation) => Json(allocation.clone()).into_response(),
            None => client_error("allocation not found"),
        },
        paths::ALLOCATIONS => {
            let owner = query.get("client").cloned().unwrap_or_default();
            let owned: Vec<&Allocation> = ledger
                .allocations
                .values()
                .filter(|allocation| allocation.owner_id == owner)
                .collect();
            Json(json!(owned)).into_response()
        }
        _ => client_error("unknown endpoint"),
    }
}
