//! `studymate explain`

use std::io::stdout;

use anyhow::{bail, Result};
use tracing::error;

use studymate_core::{StudyError, Style};
use studymate_gateway::explain_api::EXPLAIN_FAILED;

use crate::context::AppContext;
use crate::terminal_output::{render_explanation, stream_write, supports_color};

pub async fn run(ctx: &AppContext, subject: &str, style: Style, stream: bool) -> Result<()> {
    let services = ctx.services()?;
    let stream = stream || services.streaming;

    let outcome = if stream {
        let mut out = stdout();
        let mut on_delta = move |delta: &str| {
            let _ = stream_write(&mut out, delta);
        };
        let result = services
            .explainer
            .explain_stream(subject, style, &services.credentials, &mut on_delta)
            .await;
        println!();
        result
    } else {
        services
            .explainer
            .explain(subject, style, &services.credentials)
            .await
    };

    match outcome {
        Ok(result) => {
            if !stream {
                println!("{}", render_explanation(&result.raw_text, supports_color()));
            }
            Ok(())
        }
        Err(e) => {
            let err = StudyError::from(e);
            if let StudyError::RemoteFailure(detail) = &err {
                error!(%detail, "Explanation failed");
                bail!(EXPLAIN_FAILED);
            }
            Err(err.into())
        }
    }
}
