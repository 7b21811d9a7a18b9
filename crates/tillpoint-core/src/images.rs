use std::collections::HashSet;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use tillpoint_domain::is_supported_image;

use crate::error::AppError;

/// A binary attachment handed to the pipeline for decoding.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub id: String,
    pub mime: String,
    pub data: Vec<u8>,
}

/// A decoded attachment: a `data:` URL tagged with the source attachment id.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub id: String,
    pub url: String,
}

struct Request {
    attachment: ImageAttachment,
    reply: Sender<Result<DecodedImage, String>>,
}

/// Off-main-thread image decoder.
///
/// A fixed pool of worker threads turns attachments into base64 `data:`
/// URLs. Workers may complete in any order; results are matched back by
/// attachment id. Each call carries its own reply channel, so concurrent
/// calls never observe each other's completions. The pool lives as long as
/// the pipeline value and is reused across calls; dropping the pipeline
/// shuts it down. There is no cancellation — a dispatched request runs to
/// completion and callers discard unwanted results.
pub struct ImagePipeline {
    tx: Option<Sender<Request>>,
    workers: Vec<JoinHandle<()>>,
}

impl ImagePipeline {
    pub fn new(worker_count: usize) -> Self {
        debug_assert!(worker_count > 0, "pipeline needs at least one worker");
        let (tx, rx) = mpsc::channel::<Request>();
        let rx = Arc::new(Mutex::new(rx));
        let workers = (0..worker_count)
            .map(|_| {
                let rx = Arc::clone(&rx);
                thread::spawn(move || loop {
                    // Hold the lock only while receiving, not while encoding
                    let request = match rx.lock().unwrap().recv() {
                        Ok(request) => request,
                        Err(_) => break,
                    };
                    let result = decode(request.attachment);
                    // A dropped reply receiver means the caller gave up
                    let _ = request.reply.send(result);
                })
            })
            .collect();
        Self {
            tx: Some(tx),
            workers,
        }
    }

    /// Decode a single attachment, blocking until its worker answers.
    pub fn process_image(&self, attachment: ImageAttachment) -> Result<DecodedImage, AppError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.dispatch(attachment, reply_tx)?;
        match reply_rx.recv() {
            Ok(Ok(image)) => Ok(image),
            Ok(Err(message)) => Err(decode_error(message)),
            Err(_) => Err(pool_gone()),
        }
    }

    /// Decode a batch of attachments.
    ///
    /// Resolves once every dispatched attachment has completed; the result
    /// order is completion order, not dispatch order. The first individual
    /// failure rejects the whole batch.
    pub fn process_images(
        &self,
        attachments: Vec<ImageAttachment>,
    ) -> Result<Vec<DecodedImage>, AppError> {
        if attachments.is_empty() {
            return Ok(Vec::new());
        }

        let (reply_tx, reply_rx) = mpsc::channel();
        let mut pending: HashSet<String> =
            attachments.iter().map(|a| a.id.clone()).collect();
        for attachment in attachments {
            self.dispatch(attachment, reply_tx.clone())?;
        }
        drop(reply_tx);

        let mut results = Vec::new();
        while !pending.is_empty() {
            match reply_rx.recv() {
                Ok(Ok(image)) => {
                    pending.remove(&image.id);
                    results.push(image);
                }
                Ok(Err(message)) => return Err(decode_error(message)),
                Err(_) => return Err(pool_gone()),
            }
        }
        Ok(results)
    }

    fn dispatch(
        &self,
        attachment: ImageAttachment,
        reply: Sender<Result<DecodedImage, String>>,
    ) -> Result<(), AppError> {
        let tx = self.tx.as_ref().ok_or_else(pool_gone)?;
        tx.send(Request { attachment, reply }).map_err(|_| pool_gone())
    }
}

impl Drop for ImagePipeline {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loops
        self.tx.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn decode(attachment: ImageAttachment) -> Result<DecodedImage, String> {
    if !is_supported_image(&attachment.mime) {
        return Err(format!(
            "{}: unsupported image type '{}'",
            attachment.id, attachment.mime
        ));
    }
    if attachment.data.is_empty() {
        return Err(format!("{}: empty attachment", attachment.id));
    }
    let url = format!(
        "data:{};base64,{}",
        attachment.mime,
        STANDARD.encode(&attachment.data)
    );
    Ok(DecodedImage {
        id: attachment.id,
        url,
    })
}

fn decode_error(message: String) -> AppError {
    AppError::Backend {
        message: format!("image decode failed: {message}"),
        code: Some("image_decode".into()),
        status: None,
    }
}

fn pool_gone() -> AppError {
    AppError::Backend {
        message: "image worker pool is shut down".into(),
        code: Some("image_decode".into()),
        status: None,
    }
}
