//! HTTP decode API
//!
//! A thin axum surface over the decode pipeline: one POST route taking
//! either raw calldata (plus optional address context) or a transaction
//! reference (hash or explorer URL) to fetch first. All origins are
//! permitted; preflight is handled explicitly.
//!
//! The decode tree stringifies numeric leaves when it is built, so the JSON
//! response is bigint-safe without a custom serializer.

use std::sync::Arc;

use alloy_primitives::Address;
use anyhow::Context;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::decode::{parse_hex_bytes, Decoder};
use crate::domain::TransactionSource;
use crate::infrastructure::ExplorerTable;

pub struct AppState {
    pub decoder: Decoder,
    pub transactions: Arc<dyn TransactionSource>,
    pub explorers: ExplorerTable,
}

#[derive(Debug, Deserialize)]
pub struct DecodeRequest {
    #[serde(default)]
    pub calldata: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, rename = "chainId")]
    pub chain_id: Option<u64>,
    #[serde(default)]
    pub tx: Option<String>,
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: message.into(),
        }
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.message });
        with_cors((self.status, Json(body)).into_response())
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/decode", post(decode_calldata).options(preflight))
        .with_state(state)
}

/// Bind and run the API until shutdown.
pub async fn serve(state: Arc<AppState>, listen: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;
    info!("decode API listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .await
        .context("server error")?;
    Ok(())
}

async fn decode_calldata(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DecodeRequest>,
) -> Result<Response, AppError> {
    let (calldata, context) = resolve_request(&state, &request).await?;
    info!(
        bytes = calldata.len(),
        with_context = context.is_some(),
        "decoding calldata"
    );

    let tree = state
        .decoder
        .decode_recursive(&calldata, context)
        .await
        .ok_or_else(|| AppError::unprocessable("unable to decode calldata"))?;

    Ok(with_cors(Json(tree).into_response()))
}

async fn preflight() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("content-type"),
    );
    response
}

fn with_cors(mut response: Response) -> Response {
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}

/// Turn a request body into `(calldata, address context)`, fetching the
/// transaction first when a tx reference was supplied.
async fn resolve_request(
    state: &AppState,
    request: &DecodeRequest,
) -> Result<(Vec<u8>, Option<(Address, u64)>), AppError> {
    if let Some(tx) = request.tx.as_deref().filter(|tx| !tx.trim().is_empty()) {
        let (chain_id, hash) = state
            .explorers
            .resolve(tx, request.chain_id)
            .map_err(|err| AppError::bad_request(err.to_string()))?;
        let fetched = state
            .transactions
            .fetch_transaction(chain_id, hash)
            .await
            .map_err(|err| AppError::bad_gateway(format!("transaction fetch failed: {err:#}")))?;
        let context = fetched.to.map(|to| (to, chain_id));
        return Ok((fetched.input.to_vec(), context));
    }

    let calldata = request
        .calldata
        .as_deref()
        .ok_or_else(|| AppError::bad_request("either 'calldata' or 'tx' is required"))?;
    let calldata = parse_hex_bytes(calldata)
        .map_err(|err| AppError::bad_request(format!("invalid calldata: {err:#}")))?;

    let context = match (&request.address, request.chain_id) {
        (Some(address), Some(chain_id)) => {
            let address = address
                .parse::<Address>()
                .map_err(|_| AppError::bad_request("invalid 'address'"))?;
            Some((address, chain_id))
        }
        _ => None,
    };

    Ok((calldata, context))
}
