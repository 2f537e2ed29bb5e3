use std::{sync::Arc, time::Duration};

use tracing::info;

use crate::{
    api::handler::AppState,
    config::Config,
    error::AppResult,
    reconciliation::{AnticipationPolicy, FeeSchedule, Reconciler},
    retrieval::Retriever,
    settlement::SettlementService,
    upstream::{GuruClient, TransactionSource},
};

pub async fn initialize_app_state(config: &Config) -> AppResult<AppState> {
    info!("Initializing application components ...");

    let client = Arc::new(GuruClient::new(
        &config.guru_api_base_url,
        &config.guru_api_token,
        Duration::from_secs(config.request_timeout_secs),
    )?);
    client.ensure_ready().await?;
    info!("✅ Gateway client ready: {}", config.guru_api_base_url);

    let retriever = Retriever::new(client).with_max_chunk_days(config.max_chunk_days);

    let fees = FeeSchedule::default()
        .with_anticipation(AnticipationPolicy::from_kind(config.anticipation_policy));
    info!("✅ Anticipation policy: {:?}", config.anticipation_policy);

    let settlement = SettlementService::new(retriever, Reconciler::new(fees))
        .with_default_lookback(config.default_lookback_days);

    Ok(AppState {
        settlement: Arc::new(settlement),
    })
}
