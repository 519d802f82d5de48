use std::sync::Arc;

use actix_web::{App, HttpServer};
use anyhow::Context;
use opentelemetry::global;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::runtime::TokioCurrentThread;
use paperclip::actix::{web, OpenApiExt};
use tracing_actix_web::TracingLogger;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

use book_service::app_config::config_app;
use book_service::auth::{
    AuthorizationGate, KeycloakTokenVerifier, KeycloakTokenVerifierConfig, Principal,
    StaticTokenVerifier, TokenVerifier,
};
use book_service::books_repository::{
    BookRepository, InMemoryBookRepository, PostgresBooksRepository,
    PostgresBooksRepositoryConfig,
};
use book_service::books_service::BookService;
use book_service::settings::{AuthSettings, DatabaseSettings, Settings, TelemetrySettings};

// Based on https://github.com/LukeMathWalker/tracing-actix-web/blob/main/examples/opentelemetry/src/main.rs#L15
fn init_telemetry(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let app_name = settings.service_name.clone();

    // Spans are exported to Jaeger in batch only when enabled
    let telemetry = if settings.jaeger_enabled {
        global::set_text_map_propagator(TraceContextPropagator::new());
        #[allow(deprecated)]
        let tracer = opentelemetry_jaeger::new_agent_pipeline()
            .with_service_name(app_name.clone())
            .install_batch(TokioCurrentThread)
            .context("Failed to install OpenTelemetry tracer.")?;
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    // Tunable via `RUST_LOG` env variable
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .context("Invalid log filter")?;
    let formatting_layer = BunyanFormattingLayer::new(app_name, std::io::stdout);
    let subscriber = Registry::default()
        .with(env_filter)
        .with(telemetry)
        .with(JsonStorageLayer)
        .with(formatting_layer);
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install `tracing` subscriber.")
}

async fn init_repository(settings: &DatabaseSettings) -> anyhow::Result<Arc<dyn BookRepository>> {
    if settings.in_memory {
        tracing::warn!("Using in-memory book repository, books are lost on restart");
        return Ok(Arc::new(InMemoryBookRepository::default()));
    }
    let repository = PostgresBooksRepository::init(PostgresBooksRepositoryConfig {
        hostname: settings.hostname.clone(),
        username: settings.username.clone(),
        password: settings.password.clone(),
    })
    .await?;
    Ok(Arc::new(repository))
}

fn init_token_verifier(settings: &AuthSettings) -> anyhow::Result<Arc<dyn TokenVerifier>> {
    if let Some(dev_token) = &settings.dev_token {
        tracing::warn!("Using static development token, Keycloak is not consulted");
        return Ok(Arc::new(StaticTokenVerifier::default().with_token(
            dev_token,
            Principal::new("developer", &[settings.required_role.as_str()]),
        )));
    }
    Ok(Arc::new(KeycloakTokenVerifier::new(
        KeycloakTokenVerifierConfig {
            keycloak_url: settings.keycloak_url.clone(),
            realm: settings.realm.clone(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
        },
    )?))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_telemetry(&settings.telemetry)?;

    let books_service = web::Data::new(BookService::new(
        init_repository(&settings.database).await?,
    ));
    let authorization_gate = web::Data::new(AuthorizationGate::new(
        init_token_verifier(&settings.auth)?,
        &settings.auth.required_role,
    ));

    tracing::info!(
        "starting HTTP server at http://{}:{}",
        settings.server.host,
        settings.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap_api()
            .app_data(books_service.clone())
            .app_data(authorization_gate.clone())
            .wrap(TracingLogger::default())
            .configure(config_app)
            .with_json_spec_at("/apispec/v2")
            .build()
    })
    .bind((settings.server.host.as_str(), settings.server.port))?
    .run()
    .await?;

    opentelemetry::global::shutdown_tracer_provider();
    Ok(())
}
