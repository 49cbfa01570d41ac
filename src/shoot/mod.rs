//! Runs compiled views against an image backend: single requests, batch
//! previews and batch execution with credits and a stop signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use tracing::{info, warn};

use crate::backend::{normalize_resolution, DynBackend, GenerationError, GenerationPayload};
use crate::compiler::batch::{plan_batch, BatchRequest, PlannedShot, PreviewDocument};
use crate::compiler::request::ShootRequest;
use crate::compiler::{compile_request, compile_view, plan_views, CompileError, CompiledView, View};
use crate::config::CONFIG;
use crate::utils::text::non_empty;

pub mod credits;

use credits::{CreditError, CreditLedger, Pricing};

const SEED_MODULUS: u128 = 1_000_000_000;

#[derive(Debug, thiserror::Error)]
pub enum ShootError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Credit(#[from] CreditError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Caller seed, or a fresh one below 10^9.
pub fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| (uuid::Uuid::new_v4().as_u128() % SEED_MODULUS) as u64)
}

/// Best-effort cancellation for batches. Checked before each item starts;
/// items already running finish normally.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub default_resolution: String,
    pub default_aspect_ratio: String,
    pub concurrency: usize,
    pub pricing: Pricing,
}

impl ServiceSettings {
    pub fn from_config() -> Self {
        ServiceSettings {
            default_resolution: CONFIG.default_resolution.clone(),
            default_aspect_ratio: CONFIG.default_aspect_ratio.clone(),
            concurrency: CONFIG.batch_concurrency,
            pricing: Pricing {
                per_shot: CONFIG.credits_per_shot,
                per_shot_4k: CONFIG.credits_per_shot_4k,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewResponse {
    pub resolution: &'static str,
    pub aspect_ratio: String,
    pub previews: Vec<CompiledView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedImage {
    pub view: View,
    pub title: &'static str,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateResponse {
    pub seed: u64,
    pub resolution: &'static str,
    pub aspect_ratio: String,
    pub credits_spent: u32,
    pub images: Vec<GeneratedImage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchPreviewItem {
    pub index: u32,
    pub title: String,
    pub shot_id: &'static str,
    pub document: PreviewDocument,
    pub compiled: CompiledView,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchPreview {
    pub seed: u64,
    pub items: Vec<BatchPreviewItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BatchItemOutcome {
    Succeeded { url: String },
    Failed { message: String },
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchItemReport {
    pub index: u32,
    pub title: String,
    pub shot_id: &'static str,
    #[serde(flatten)]
    pub outcome: BatchItemOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub seed: u64,
    pub credits_spent: u32,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub items: Vec<BatchItemReport>,
}

pub struct ShootService {
    backend: DynBackend,
    ledger: Box<dyn CreditLedger>,
    settings: ServiceSettings,
    stop: StopSignal,
}

impl ShootService {
    pub fn new(backend: DynBackend, ledger: Box<dyn CreditLedger>, settings: ServiceSettings) -> Self {
        ShootService {
            backend,
            ledger,
            settings,
            stop: StopSignal::default(),
        }
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    fn resolution_for(&self, request: &ShootRequest) -> &'static str {
        let requested = non_empty(request.resolution.as_deref())
            .unwrap_or(self.settings.default_resolution.as_str());
        normalize_resolution(requested)
    }

    fn aspect_ratio_for(&self, request: &ShootRequest) -> String {
        non_empty(request.aspect_ratio.as_deref())
            .unwrap_or(self.settings.default_aspect_ratio.as_str())
            .to_string()
    }

    async fn render(
        &self,
        compiled: &CompiledView,
        seed: u64,
        resolution: &'static str,
        aspect_ratio: &str,
        enable_web_search: bool,
    ) -> Result<String, GenerationError> {
        let payload = GenerationPayload {
            prompt: compiled.prompt.clone(),
            negative_prompt: compiled.negative_prompt.clone(),
            image_urls: compiled.input_images.clone(),
            aspect_ratio: aspect_ratio.to_string(),
            resolution: resolution.to_string(),
            seed,
            enable_web_search,
        };
        info!(
            "rendering {} via {} (seed={}, images={})",
            compiled.view.id(),
            self.backend.name(),
            seed,
            payload.image_urls.len()
        );
        self.backend.generate(&payload).await
    }

    /// Compiles every planned view without touching the backend or the ledger.
    pub fn preview(&self, request: &ShootRequest) -> Result<PreviewResponse, CompileError> {
        Ok(PreviewResponse {
            resolution: self.resolution_for(request),
            aspect_ratio: self.aspect_ratio_for(request),
            previews: compile_request(request)?,
        })
    }

    pub async fn generate(&self, request: &ShootRequest) -> Result<GenerateResponse, ShootError> {
        // An unknown framing can never compile; reject it before billing.
        request.explicit_framing()?;
        let resolution = self.resolution_for(request);
        let cost = self
            .settings
            .pricing
            .total(resolution, plan_views(request).len());
        self.ledger.reserve(cost).await?;

        let compiled = compile_request(request)?;
        let seed = resolve_seed(request.seed);
        let aspect_ratio = self.aspect_ratio_for(request);

        let images: Vec<GeneratedImage> = stream::iter(compiled.iter())
            .map(|view| {
                let aspect_ratio = aspect_ratio.as_str();
                async move {
                    let url = self
                        .render(view, seed, resolution, aspect_ratio, request.enable_web_search)
                        .await?;
                    Ok::<_, GenerationError>(GeneratedImage {
                        view: view.view,
                        title: view.title,
                        url,
                    })
                }
            })
            .buffered(self.settings.concurrency.max(1))
            .try_collect()
            .await?;

        Ok(GenerateResponse {
            seed,
            resolution,
            aspect_ratio,
            credits_spent: cost,
            images,
        })
    }

    pub fn preview_batch(&self, batch: &BatchRequest) -> Result<BatchPreview, CompileError> {
        let seed = resolve_seed(batch.base.seed);
        let items = plan_batch(batch, seed)?
            .into_iter()
            .map(|shot| {
                let compiled = compile_view(&shot.request, shot.view)?;
                Ok::<_, CompileError>(BatchPreviewItem {
                    index: shot.index,
                    title: shot.title,
                    shot_id: shot.spec.view,
                    document: shot.document,
                    compiled,
                })
            })
            .collect::<Result<Vec<_>, CompileError>>()?;
        Ok(BatchPreview { seed, items })
    }

    async fn render_shot(
        &self,
        shot: &PlannedShot,
        seed: u64,
        resolution: &'static str,
        aspect_ratio: &str,
    ) -> Result<String, ShootError> {
        let compiled = compile_view(&shot.request, shot.view)?;
        let url = self
            .render(&compiled, seed, resolution, aspect_ratio, shot.request.enable_web_search)
            .await?;
        Ok(url)
    }

    async fn run_shot(
        &self,
        shot: PlannedShot,
        seed: u64,
        resolution: &'static str,
        aspect_ratio: &str,
    ) -> BatchItemReport {
        let outcome = if self.stop.is_stopped() {
            BatchItemOutcome::Skipped
        } else {
            match self.render_shot(&shot, seed, resolution, aspect_ratio).await {
                Ok(url) => BatchItemOutcome::Succeeded { url },
                Err(err) => {
                    warn!("{}: {}", shot.title, err);
                    BatchItemOutcome::Failed {
                        message: err.to_string(),
                    }
                }
            }
        };
        BatchItemReport {
            index: shot.index,
            title: shot.title,
            shot_id: shot.spec.view,
            outcome,
        }
    }

    /// Reserves credits for every selected shot, then renders them with one
    /// shared seed. A failing shot is recorded and the batch carries on.
    pub async fn run_batch(&self, batch: &BatchRequest) -> Result<BatchReport, ShootError> {
        let seed = resolve_seed(batch.base.seed);
        let shots = plan_batch(batch, seed)?;
        let resolution = self.resolution_for(&batch.base);
        let aspect_ratio = self.aspect_ratio_for(&batch.base);
        let cost = self.settings.pricing.total(resolution, shots.len());
        self.ledger.reserve(cost).await?;

        self.stop.reset();
        let concurrency = batch
            .concurrency
            .unwrap_or(self.settings.concurrency)
            .max(1);
        info!(
            "running batch: shots={} seed={} concurrency={} credits={}",
            shots.len(),
            seed,
            concurrency,
            cost
        );

        let items: Vec<BatchItemReport> = stream::iter(shots)
            .map(|shot| self.run_shot(shot, seed, resolution, &aspect_ratio))
            .buffered(concurrency)
            .collect()
            .await;

        let (mut succeeded, mut failed, mut skipped) = (0, 0, 0);
        for item in &items {
            match item.outcome {
                BatchItemOutcome::Succeeded { .. } => succeeded += 1,
                BatchItemOutcome::Failed { .. } => failed += 1,
                BatchItemOutcome::Skipped => skipped += 1,
            }
        }
        info!(
            "batch finished: succeeded={} failed={} skipped={}",
            succeeded, failed, skipped
        );

        Ok(BatchReport {
            seed,
            credits_spent: cost,
            succeeded,
            failed,
            skipped,
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::credits::InMemoryLedger;
    use super::*;
    use crate::backend::ImageBackend;

    #[derive(Default)]
    struct FakeBackend {
        calls: AtomicUsize,
        fail_on_call: Option<usize>,
        stop_after_first: Option<StopSignal>,
        payloads: Arc<Mutex<Vec<GenerationPayload>>>,
    }

    #[async_trait]
    impl ImageBackend for FakeBackend {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn generate(&self, payload: &GenerationPayload) -> Result<String, GenerationError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.payloads
                .lock()
                .expect("payload log")
                .push(payload.clone());
            if let Some(stop) = self.stop_after_first.as_ref() {
                stop.request_stop();
            }
            if self.fail_on_call == Some(call) {
                return Err(GenerationError::Backend {
                    provider: "fake",
                    message: "content policy".to_string(),
                });
            }
            Ok(format!("https://cdn.test/{call}.png"))
        }
    }

    fn settings() -> ServiceSettings {
        ServiceSettings {
            default_resolution: "1K".to_string(),
            default_aspect_ratio: "3:4".to_string(),
            concurrency: 1,
            pricing: Pricing {
                per_shot: 4,
                per_shot_4k: 8,
            },
        }
    }

    fn request() -> ShootRequest {
        let mut request = ShootRequest {
            product_name: "Wide Leg Trousers".to_string(),
            product_code: Some("WL".to_string()),
            gender: Some(crate::compiler::request::Gender::Female),
            ..Default::default()
        };
        request
            .uploaded_images
            .insert("model".to_string(), "http://x/model.png".to_string());
        request
            .uploaded_images
            .insert("bottom_front".to_string(), "http://x/bottom.png".to_string());
        request
    }

    fn service(backend: FakeBackend, balance: u32) -> ShootService {
        ShootService::new(Box::new(backend), Box::new(InMemoryLedger::new(balance)), settings())
    }

    #[test]
    fn resolves_seed_within_range_or_keeps_callers() {
        assert_eq!(resolve_seed(Some(42)), 42);
        assert!(resolve_seed(None) < 1_000_000_000);
    }

    #[tokio::test]
    async fn angle_set_shares_one_seed_and_bills_per_view() {
        let payloads = Arc::new(Mutex::new(Vec::new()));
        let backend = FakeBackend {
            payloads: payloads.clone(),
            ..Default::default()
        };
        let shoot = service(backend, 100);
        let mut req = request();
        req.is_angles = true;
        req.resolution = Some("4K".to_string());

        let response = shoot.generate(&req).await.expect("generate");
        assert_eq!(response.images.len(), 3);
        assert_eq!(response.credits_spent, 24);
        assert_eq!(response.resolution, "4K");
        assert_eq!(response.images[2].title, "Back View");

        let payloads = payloads.lock().expect("payload log");
        assert!(payloads.iter().all(|payload| payload.seed == response.seed));
        assert!(payloads.iter().all(|payload| payload.aspect_ratio == "3:4"));
    }

    #[tokio::test]
    async fn insufficient_credits_stop_before_backend() {
        let payloads = Arc::new(Mutex::new(Vec::new()));
        let backend = FakeBackend {
            payloads: payloads.clone(),
            ..Default::default()
        };
        let shoot = service(backend, 3);
        let err = shoot.generate(&request()).await.expect_err("no credits");
        assert!(matches!(err, ShootError::Credit(CreditError::Insufficient { required: 4, .. })));
        assert!(payloads.lock().expect("payload log").is_empty());
    }

    #[tokio::test]
    async fn unknown_framing_is_rejected_before_billing() {
        let payloads = Arc::new(Mutex::new(Vec::new()));
        let backend = FakeBackend {
            payloads: payloads.clone(),
            ..Default::default()
        };
        let shoot = service(backend, 3);
        let mut req = request();
        req.framing = Some("knees_up".to_string());

        let err = shoot.generate(&req).await.expect_err("bad framing");
        assert!(matches!(
            err,
            ShootError::Compile(CompileError::UnrecognizedFraming(ref value)) if value == "knees_up"
        ));
        assert!(payloads.lock().expect("payload log").is_empty());
    }

    #[test]
    fn preview_never_bills_or_renders() {
        let shoot = service(FakeBackend::default(), 0);
        let preview = shoot.preview(&request()).expect("preview");
        assert_eq!(preview.previews.len(), 1);
        assert_eq!(preview.previews[0].title, "Styling Shot");
        assert_eq!(preview.resolution, "1K");
    }

    #[tokio::test]
    async fn batch_records_failures_and_keeps_going() {
        let backend = FakeBackend {
            fail_on_call: Some(2),
            ..Default::default()
        };
        let shoot = service(backend, 100);
        let batch = BatchRequest {
            base: request(),
            ..Default::default()
        };

        let report = shoot.run_batch(&batch).await.expect("batch");
        assert_eq!(report.items.len(), 7);
        assert_eq!(report.credits_spent, 28);
        assert_eq!(report.failed, 1);
        assert_eq!(report.succeeded, 6);
        assert_eq!(report.items[1].title, "WL2");
        assert_eq!(
            report.items[1].outcome,
            BatchItemOutcome::Failed {
                message: "fake error: content policy".to_string()
            }
        );
    }

    #[tokio::test]
    async fn stop_signal_skips_remaining_items() {
        let stop = StopSignal::default();
        let backend = FakeBackend {
            stop_after_first: Some(stop.clone()),
            ..Default::default()
        };
        let mut shoot = service(backend, 100);
        shoot.stop = stop;

        let batch = BatchRequest {
            base: request(),
            selection: Some(vec![
                "styling_front".to_string(),
                "technical_front".to_string(),
                "detail_front".to_string(),
            ]),
            ..Default::default()
        };
        let report = shoot.run_batch(&batch).await.expect("batch");
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.credits_spent, 12);
    }

    #[test]
    fn batch_preview_returns_documents_with_shared_seed() {
        let shoot = service(FakeBackend::default(), 0);
        let mut base = request();
        base.seed = Some(9);
        let preview = shoot
            .preview_batch(&BatchRequest {
                base,
                ..Default::default()
            })
            .expect("preview");
        assert_eq!(preview.seed, 9);
        assert_eq!(preview.items.len(), 7);
        assert_eq!(preview.items[0].shot_id, "styling_front");
        assert_eq!(preview.items[0].compiled.view, View::Styling);
        assert_eq!(preview.items[6].compiled.view.id(), "detail_back");
    }
}
