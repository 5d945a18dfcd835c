//! Pure Rust OCR engine wrapper using `pure-onnx-ocr`.

use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Instant;

use image::DynamicImage;
use tracing::{debug, info, Span};

use crate::error::OcrError;
use crate::models::config::OcrConfig;

use super::{join_lines, sort_reading_order, Recognizer, TextBox};

/// OCR engine backed by `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).
///
/// The underlying engine cannot leave the thread that built it, so it lives
/// on a dedicated worker thread and requests are queued to it. Callers on any
/// thread share one engine; recognition is serialized.
pub struct PureOcrEngine {
    worker: Worker,
}

// Shared across request threads through `Recognizer`.
const _: fn() = || {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<PureOcrEngine>();
};

impl PureOcrEngine {
    /// Load the detection model, recognition model and dictionary named by `config`.
    pub fn from_config(config: &OcrConfig) -> Result<Self, OcrError> {
        let (det_path, rec_path, dict_path) = config.model_paths();

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!(
                    "model file not found: {}",
                    path.display()
                )));
            }
        }

        let keep_unk = config.keep_unk;
        let worker = Worker::spawn(
            move || build_engine(det_path, rec_path, dict_path),
            move |engine: &pure_onnx_ocr::engine::OcrEngine, image: &DynamicImage| {
                run_engine(engine, image, keep_unk)
            },
        )?;

        info!("Loaded pure-onnx-ocr engine from {}", config.model_dir.display());

        Ok(Self { worker })
    }

    /// Recognize text regions in reading order.
    pub fn process(&self, image: &DynamicImage) -> Result<Vec<TextBox>, OcrError> {
        self.worker.run(image)
    }
}

impl Recognizer for PureOcrEngine {
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let boxes = self.process(image)?;
        Ok(join_lines(&boxes))
    }
}

fn build_engine(
    det_path: PathBuf,
    rec_path: PathBuf,
    dict_path: PathBuf,
) -> Result<pure_onnx_ocr::engine::OcrEngine, OcrError> {
    pure_onnx_ocr::engine::OcrEngineBuilder::new()
        .det_model_path(&det_path)
        .rec_model_path(&rec_path)
        .dictionary_path(&dict_path)
        .build()
        .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))
}

fn run_engine(
    engine: &pure_onnx_ocr::engine::OcrEngine,
    image: &DynamicImage,
    keep_unk: bool,
) -> Result<Vec<TextBox>, OcrError> {
    let start = Instant::now();

    let results = engine
        .run_from_image(image)
        .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

    let mut boxes: Vec<TextBox> = results
        .iter()
        .map(|r| TextBox {
            bbox: polygon_to_bbox(&r.bounding_box),
            text: if keep_unk {
                r.text.clone()
            } else {
                r.text.replace("[UNK]", " ")
            },
            confidence: r.confidence,
        })
        .collect();

    sort_reading_order(&mut boxes);

    debug!(
        "OCR found {} text regions in {}ms",
        boxes.len(),
        start.elapsed().as_millis()
    );

    Ok(boxes)
}

type Reply = mpsc::Sender<Result<Vec<TextBox>, OcrError>>;

struct Job {
    image: DynamicImage,
    span: Span,
    reply: Reply,
}

/// Owns a thread-bound engine and runs queued jobs on it.
///
/// The thread exits once the `Worker` is dropped and the queue drains.
struct Worker {
    jobs: mpsc::Sender<Job>,
}

impl Worker {
    /// Start the thread and build the engine on it, waiting for the result.
    fn spawn<E, I, R>(init: I, run: R) -> Result<Self, OcrError>
    where
        E: 'static,
        I: FnOnce() -> Result<E, OcrError> + Send + 'static,
        R: Fn(&E, &DynamicImage) -> Result<Vec<TextBox>, OcrError> + Send + 'static,
    {
        let (jobs, queue) = mpsc::channel::<Job>();
        let (ready_tx, ready_rx) = mpsc::channel();

        std::thread::Builder::new()
            .name("invex-ocr".to_string())
            .spawn(move || {
                let engine = match init() {
                    Ok(engine) => {
                        let _ = ready_tx.send(Ok(()));
                        engine
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                while let Ok(job) = queue.recv() {
                    let _entered = job.span.enter();
                    let _ = job.reply.send(run(&engine, &job.image));
                }
                debug!("OCR worker stopped");
            })
            .map_err(|e| OcrError::ModelLoad(format!("failed to start OCR worker: {}", e)))?;

        ready_rx
            .recv()
            .map_err(|_| OcrError::ModelLoad("OCR worker exited during startup".to_string()))??;

        Ok(Self { jobs })
    }

    fn run(&self, image: &DynamicImage) -> Result<Vec<TextBox>, OcrError> {
        let stopped = || OcrError::Recognition("OCR worker has stopped".to_string());

        let (reply, answer) = mpsc::channel();
        self.jobs
            .send(Job {
                image: image.clone(),
                span: Span::current(),
                reply,
            })
            .map_err(|_| stopped())?;

        answer.recv().map_err(|_| stopped())?
    }
}

/// Convert a `Polygon<f64>` to our `[f32; 8]` bbox format.
///
/// Takes the first 4 exterior points as `[x1, y1, x2, y2, x3, y3, x4, y4]`.
fn polygon_to_bbox(polygon: &pure_onnx_ocr::Polygon<f64>) -> [f32; 8] {
    let mut bbox = [0.0f32; 8];
    for (i, coord) in polygon.exterior().coords().take(4).enumerate() {
        bbox[i * 2] = coord.x as f32;
        bbox[i * 2 + 1] = coord.y as f32;
    }
    bbox
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    /// Stand-in for an engine that must stay on its own thread.
    type ThreadBound = Rc<Cell<usize>>;

    fn counting_worker() -> Worker {
        Worker::spawn(
            || Ok(ThreadBound::default()),
            |calls: &ThreadBound, image: &DynamicImage| {
                calls.set(calls.get() + 1);
                Ok(vec![TextBox {
                    bbox: [0.0; 8],
                    text: format!("{}x{} #{}", image.width(), image.height(), calls.get()),
                    confidence: 1.0,
                }])
            },
        )
        .unwrap()
    }

    #[test]
    fn missing_models_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = OcrConfig {
            model_dir: dir.path().to_path_buf(),
            ..OcrConfig::default()
        };
        assert!(matches!(
            PureOcrEngine::from_config(&config),
            Err(OcrError::ModelLoad(_))
        ));
    }

    #[test]
    fn worker_reports_engine_build_failure() {
        let result = Worker::spawn(
            || Err::<ThreadBound, _>(OcrError::ModelLoad("bad model".to_string())),
            |_: &ThreadBound, _: &DynamicImage| Ok(Vec::new()),
        );
        assert!(matches!(result, Err(OcrError::ModelLoad(m)) if m == "bad model"));
    }

    #[test]
    fn worker_serves_callers_on_many_threads() {
        let worker = counting_worker();
        let image = DynamicImage::new_luma8(4, 3);

        let mut texts: Vec<String> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| worker.run(&image).unwrap().remove(0).text))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        texts.sort();

        assert_eq!(texts, ["4x3 #1", "4x3 #2", "4x3 #3", "4x3 #4"]);
    }

    #[test]
    fn recognition_errors_reach_the_caller() {
        let worker = Worker::spawn(
            || Ok(ThreadBound::default()),
            |_: &ThreadBound, _: &DynamicImage| {
                Err(OcrError::Recognition("model crashed".to_string()))
            },
        )
        .unwrap();

        let result = worker.run(&DynamicImage::new_luma8(1, 1));
        assert!(matches!(result, Err(OcrError::Recognition(m)) if m == "model crashed"));
        // A failed job leaves the worker running.
        let again = worker.run(&DynamicImage::new_luma8(1, 1));
        assert!(matches!(again, Err(OcrError::Recognition(m)) if m == "model crashed"));
    }
}
