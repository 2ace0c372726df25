use crate::config::Config;
use crate::page::{StderrAlert, TerminalImage};
use anyhow::{Context, Result};
use qr_form_client::page::{TextInput, EXPIRES_INPUT_ID, FORM_ID, URL_INPUT_ID};
use qr_form_client::{
    FormElements, GenerateApi, GenerateBackend, QrForm, ResponseOrdering, SubmitEvent,
    SubmitOutcome,
};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info};

pub struct App {
    form: QrForm,
    url: Arc<TextInput>,
    expires: Arc<TextInput>,
    image: Arc<TerminalImage>,
    pending_url: Option<String>,
}

impl App {
    pub fn from_config(config: &Config) -> Result<Self> {
        let api = GenerateApi::with_options(&config.backend.base_url, config.client_options())
            .context("building backend client")?;
        let image = TerminalImage::new(
            api.base_url().clone(),
            config
                .page
                .download
                .then(|| config.page.download_dir.clone()),
            reqwest::Client::new(),
        );
        Ok(Self::new(Arc::new(api), image, config.page.ordering))
    }

    pub fn new(
        backend: Arc<dyn GenerateBackend>,
        image: TerminalImage,
        ordering: ResponseOrdering,
    ) -> Self {
        let url = Arc::new(TextInput::default());
        let expires = Arc::new(TextInput::default());
        let image = Arc::new(image);
        let elements = FormElements {
            url: url.clone(),
            expires: expires.clone(),
            image: image.clone(),
            alerts: Arc::new(StderrAlert),
        };
        Self {
            form: QrForm::new(backend, elements).with_ordering(ordering),
            url,
            expires,
            image,
            pending_url: None,
        }
    }

    pub fn image(&self) -> &TerminalImage {
        &self.image
    }

    fn submit(&mut self, url: &str, expires: &str) {
        self.url.set_value(url);
        self.expires.set_value(expires);
        let submission = self.form.handle_submit(&mut SubmitEvent::new());
        info!(form = FORM_ID, generation = submission.generation, "Submitted");
    }

    /// Submits a single pair and waits for its response and any download.
    pub async fn run_once(&mut self, url: &str, expires: &str) -> Option<SubmitOutcome> {
        self.submit(url, expires);
        let outcome = self.form.next_outcome().await;
        self.image.wait_downloads().await;
        outcome
    }

    /// Prompts for field pairs until the input ends, applying responses as
    /// they resolve. Returns every outcome in the order it was applied.
    pub async fn run_interactive<R>(&mut self, input: R) -> Result<Vec<SubmitOutcome>>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let mut outcomes = Vec::new();
        prompt(URL_INPUT_ID);

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line.context("reading input")? {
                        Some(line) => self.handle_line(line.trim()),
                        None => break,
                    }
                }
                Some(outcome) = self.form.next_outcome(), if self.form.in_flight() > 0 => {
                    debug!(?outcome, "Response applied");
                    outcomes.push(outcome);
                }
            }
        }

        while let Some(outcome) = self.form.next_outcome().await {
            debug!(?outcome, "Response applied");
            outcomes.push(outcome);
        }
        self.image.wait_downloads().await;
        Ok(outcomes)
    }

    fn handle_line(&mut self, line: &str) {
        match self.pending_url.take() {
            None => {
                self.pending_url = Some(line.to_string());
                prompt(EXPIRES_INPUT_ID);
            }
            Some(url) => {
                self.submit(&url, line);
                prompt(URL_INPUT_ID);
            }
        }
    }
}

fn prompt(field: &str) {
    print!("{field}: ");
    let _ = std::io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use qr_form_client::{ApiResult, GenerateRequest, GenerateResponse};
    use std::sync::Mutex;
    use url::Url;

    /// Answers `{"qr_code_url": "/<url>.png"}`, or an error body for `bad`.
    #[derive(Default)]
    struct EchoBackend {
        requests: Mutex<Vec<GenerateRequest>>,
    }

    #[async_trait]
    impl GenerateBackend for EchoBackend {
        async fn generate(&self, request: &GenerateRequest) -> ApiResult<GenerateResponse> {
            self.requests.lock().unwrap().push(request.clone());
            if request.url == "bad" {
                return Ok(GenerateResponse::Failure {
                    message: Some("Invalid expiration date format".to_string()),
                });
            }
            Ok(GenerateResponse::Success {
                qr_code_url: format!("/{}.png", request.url),
            })
        }
    }

    fn app(backend: Arc<EchoBackend>) -> App {
        let image = TerminalImage::new(
            Url::parse("http://localhost:5000").unwrap(),
            None,
            reqwest::Client::new(),
        );
        App::new(backend, image, ResponseOrdering::Arrival)
    }

    #[tokio::test]
    async fn run_once_displays_the_returned_image() {
        let backend = Arc::new(EchoBackend::default());
        let mut app = app(backend.clone());

        let outcome = app.run_once("site", "2030-01-01T00:00").await.unwrap();

        assert!(matches!(outcome, SubmitOutcome::Displayed { .. }));
        assert_eq!(app.image().src().as_deref(), Some("/site.png"));
        assert_eq!(
            backend.requests.lock().unwrap().clone(),
            vec![GenerateRequest::new("site", "2030-01-01T00:00")]
        );
    }

    #[tokio::test]
    async fn interactive_mode_pairs_lines_into_submissions() {
        let backend = Arc::new(EchoBackend::default());
        let mut app = app(backend.clone());
        let input: &[u8] = b"one\n2030-01-01T00:00\nbad\nsoon\n  two  \n2031-06-01T12:00\n";

        let outcomes = app.run_interactive(input).await.unwrap();

        assert_eq!(outcomes.len(), 3);
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| matches!(o, SubmitOutcome::Alerted { .. }))
                .count(),
            1
        );
        let requests = backend.requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 3);
        assert!(requests.contains(&GenerateRequest::new("two", "2031-06-01T12:00")));
    }

    #[tokio::test]
    async fn dangling_url_without_expiry_is_not_submitted() {
        let backend = Arc::new(EchoBackend::default());
        let mut app = app(backend.clone());

        let outcomes = app.run_interactive(&b"only-url\n"[..]).await.unwrap();

        assert!(outcomes.is_empty());
        assert!(backend.requests.lock().unwrap().is_empty());
        assert_eq!(app.image().src(), None);
    }
}
