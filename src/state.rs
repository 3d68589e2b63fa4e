use std::{sync::Arc, time::Duration};

use axum::extract::FromRef;

use crate::{
    config::Config,
    db::DynStore,
    services::{generator::DynGenerator, mailer::Mailer, otp::OtpStore, pdf::PdfExtractor},
};

#[derive(Clone)]
pub struct AppState {
    pub store: DynStore,
    pub config: Config,
    pub generator: DynGenerator,
    pub mailer: Arc<dyn Mailer>,
    pub otps: OtpStore,
    pub pdf: PdfExtractor,
}

impl AppState {
    pub fn new(
        store: DynStore,
        config: Config,
        generator: DynGenerator,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let otps = OtpStore::new(Duration::from_secs(config.otp_ttl_secs));
        let pdf = PdfExtractor::new(
            config.pdftotext_bin.clone(),
            Duration::from_secs(config.generator_timeout_secs),
        );
        Self {
            store,
            config,
            generator,
            mailer,
            otps,
            pdf,
        }
    }
}

impl FromRef<AppState> for DynStore {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
