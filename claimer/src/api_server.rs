use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use puf_client::rpc::RpcConnection;
use serde::{Deserialize, Serialize};
use tokio::{sync::oneshot, task::JoinHandle};
use tracing::{error, info, warn};
use warp::{
    http::StatusCode,
    hyper::body::Bytes,
    reject::{LengthRequired, MethodNotAllowed, PayloadTooLarge, UnsupportedMediaType},
    reply::{Json, WithStatus},
    Filter, Rejection,
};

use crate::{
    claim::{ClaimOutcome, ClaimRequest, ClaimService, TokenBalance},
    errors::ClaimError,
    metrics::encode_metrics,
};

/// Claim bodies are a single address and an optional round label.
const MAX_BODY_BYTES: u64 = 16 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimResponse {
    pub signature: String,
    pub recipient: String,
    pub token_account: String,
    pub amount: u64,
    pub decimals: u8,
    pub created_token_account: bool,
    pub recovered_duplicate: bool,
}

impl From<ClaimOutcome> for ClaimResponse {
    fn from(outcome: ClaimOutcome) -> Self {
        Self {
            signature: outcome.signature.to_string(),
            recipient: outcome.recipient.to_string(),
            token_account: outcome.token_account.to_string(),
            amount: outcome.amount,
            decimals: outcome.decimals,
            created_token_account: outcome.created_token_account,
            recovered_duplicate: outcome.recovered_duplicate,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub owner: String,
    pub token_account: String,
    pub amount: u64,
    pub decimals: u8,
    pub ui_amount: String,
}

impl From<TokenBalance> for BalanceResponse {
    fn from(balance: TokenBalance) -> Self {
        Self {
            ui_amount: balance.ui_amount(),
            owner: balance.owner.to_string(),
            token_account: balance.token_account.to_string(),
            amount: balance.amount,
            decimals: balance.decimals,
        }
    }
}

fn error_json(message: &str, status: StatusCode) -> WithStatus<Json> {
    warp::reply::with_status(
        warp::reply::json(&ErrorResponse {
            error: message.to_string(),
        }),
        status,
    )
}

fn error_reply(error: &ClaimError) -> WithStatus<Json> {
    error_json(&error.to_string(), error.status_code())
}

/// Filter rejections get the same `{ "error": ... }` body as claim errors.
async fn handle_rejection(rejection: Rejection) -> Result<WithStatus<Json>, Infallible> {
    let (message, status) = if rejection.is_not_found() {
        ("Endpoint not found", StatusCode::NOT_FOUND)
    } else if rejection.find::<PayloadTooLarge>().is_some() {
        ("Request body too large", StatusCode::PAYLOAD_TOO_LARGE)
    } else if rejection.find::<LengthRequired>().is_some() {
        ("Content-Length header is required", StatusCode::LENGTH_REQUIRED)
    } else if rejection.find::<MethodNotAllowed>().is_some() {
        ("Method not allowed", StatusCode::METHOD_NOT_ALLOWED)
    } else if rejection.find::<UnsupportedMediaType>().is_some() {
        ("Unsupported media type", StatusCode::UNSUPPORTED_MEDIA_TYPE)
    } else if rejection.find::<warp::cors::CorsForbidden>().is_some() {
        ("CORS request forbidden", StatusCode::FORBIDDEN)
    } else {
        error!("Unhandled rejection: {:?}", rejection);
        ("Internal server error", StatusCode::INTERNAL_SERVER_ERROR)
    };
    Ok(error_json(message, status))
}

fn with_service<R: RpcConnection>(
    service: Arc<ClaimService<R>>,
) -> impl Filter<Extract = (Arc<ClaimService<R>>,), Error = Infallible> + Clone {
    warp::any().map(move || service.clone())
}

async fn handle_claim<R: RpcConnection>(
    body: Bytes,
    service: Arc<ClaimService<R>>,
) -> WithStatus<Json> {
    let request: ClaimRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejected claim body: {}", e);
            return error_reply(&ClaimError::InvalidInput(format!(
                "Invalid request body: {}",
                e
            )));
        }
    };
    match service.claim(&request).await {
        Ok(outcome) => warp::reply::with_status(
            warp::reply::json(&ClaimResponse::from(outcome)),
            StatusCode::OK,
        ),
        Err(e) => error_reply(&e),
    }
}

async fn handle_balance<R: RpcConnection>(
    owner: String,
    service: Arc<ClaimService<R>>,
) -> WithStatus<Json> {
    match service.token_balance(&owner).await {
        Ok(balance) => warp::reply::with_status(
            warp::reply::json(&BalanceResponse::from(balance)),
            StatusCode::OK,
        ),
        Err(e) => {
            error!("Failed to get balance of {}: {}", owner, e);
            error_reply(&e)
        }
    }
}

pub fn routes<R: RpcConnection>(
    service: Arc<ClaimService<R>>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone {
    let claim_route = warp::path!("api" / "claim")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::bytes())
        .and(with_service(service.clone()))
        .then(handle_claim::<R>);

    let balance_route = warp::path!("api" / "balance" / String)
        .and(warp::get())
        .and(with_service(service))
        .then(handle_balance::<R>);

    let health_route = warp::path!("health").and(warp::get()).map(|| {
        warp::reply::json(&HealthResponse {
            status: "ok".to_string(),
        })
    });

    let metrics_route = warp::path!("metrics").and(warp::get()).map(|| {
        warp::reply::with_header(
            encode_metrics(),
            "content-type",
            "text/plain; version=0.0.4",
        )
    });

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST"])
        .allow_headers(vec!["content-type"]);

    claim_route
        .or(balance_route)
        .or(health_route)
        .or(metrics_route)
        .with(cors)
        .recover(handle_rejection)
}

/// Handle returned by [`spawn_api_server`] for graceful shutdown.
pub struct ApiServerHandle {
    pub addr: SocketAddr,
    pub join_handle: JoinHandle<()>,
    pub shutdown_tx: oneshot::Sender<()>,
}

impl ApiServerHandle {
    /// Trigger graceful shutdown and wait for the server to stop.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.join_handle.await {
            error!("API server task failed: {:?}", e);
        }
    }
}

/// Binds to `127.0.0.1:<port>`, or `0.0.0.0:<port>` with `allow_public_bind`.
pub fn spawn_api_server<R: RpcConnection>(
    service: Arc<ClaimService<R>>,
    port: u16,
    allow_public_bind: bool,
) -> Result<ApiServerHandle, warp::Error> {
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let addr = if allow_public_bind {
        warn!(
            "API server binding to 0.0.0.0:{} - the claim endpoint will be publicly accessible",
            port
        );
        SocketAddr::from(([0, 0, 0, 0], port))
    } else {
        SocketAddr::from(([127, 0, 0, 1], port))
    };

    let (addr, server) =
        warp::serve(routes(service)).try_bind_with_graceful_shutdown(addr, async move {
            let _ = shutdown_rx.await;
            info!("API server received shutdown signal");
        })?;
    info!("Starting HTTP API server on {}", addr);

    let join_handle = tokio::spawn(async move {
        server.await;
        info!("API server shut down gracefully");
    });

    Ok(ApiServerHandle {
        addr,
        join_handle,
        shutdown_tx,
    })
}
