//! The conversion pipeline.
//!
//! A [`Wacz`] is configured once, optionally seeded with index lines, pages
//! and extra files, then run with [`Wacz::process`]. Stages run strictly in
//! order:
//!
//! ```text
//! Configuring -> Ready -> Indexing -> Harvesting -> WritingIndex -> WritingPages
//!   -> WritingCaptures -> WritingManifest -> WritingDigest -> Finalizing -> Done
//! ```
//!
//! Only indexing is parallel; every archive write happens from this one
//! sequence. A `Wacz` can be processed once. If processing fails the output
//! file is left as is and must be discarded by the caller.

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::archive::{ArchiveAssembler, ResourceEntry};
use crate::collector::Collector;
use crate::error::{ErrorKind, Stage, WaczError, WaczResult};
use crate::indexer::{IndexPlan, index_all, read_cdxj_dir};
use crate::io::ByteSource;
use crate::manifest::{
    DATAPACKAGE_DIGEST_PATH, DATAPACKAGE_PATH, DEFAULT_TITLE, Datapackage, DatapackageDigest,
    normalize_timestamp,
};
use crate::options::{WaczConfig, WaczOptions};
use crate::pages::{PAGES_PATH, PageEntry, collect_pages_files, render_pages_jsonl};
use crate::shared_index::{CDX_BLOB_PATH, IDX_PATH, SHARED_INDEX_LIMIT, build_shared_index};
use crate::signing::{HttpSigner, Signer};

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct ProcessSummary {
    pub output: PathBuf,
    /// Capture files stored under `archive/`
    pub warcs: usize,
    /// Lines in the shared index
    pub entries: usize,
    /// Pages in the generated `pages/pages.jsonl`
    pub pages: usize,
    pub shards: usize,
    /// Ledger as listed in `datapackage.json`
    pub resources: Vec<ResourceEntry>,
    pub signed: bool,
}

/// Attach a pipeline stage to an `anyhow` failure
trait StageContext<T> {
    fn during(self, kind: ErrorKind, stage: Stage, message: &str) -> WaczResult<T>;
}

impl<T> StageContext<T> for anyhow::Result<T> {
    fn during(self, kind: ErrorKind, stage: Stage, message: &str) -> WaczResult<T> {
        self.map_err(|e| WaczError::new(kind, stage, message).with_source(e))
    }
}

pub struct Wacz {
    config: WaczConfig,
    stage: Stage,
    consumed: bool,
    collector: Arc<Collector>,
    signer: Option<Arc<dyn Signer>>,
    extra_files: Vec<(ByteSource, String)>,
}

impl Wacz {
    /// Validate `options` and prepare a run.
    ///
    /// A pre-existing output file is removed here.
    pub fn new(options: WaczOptions) -> WaczResult<Self> {
        let config = options.validate()?;

        let signer: Option<Arc<dyn Signer>> = match &config.signing_url {
            Some(url) => {
                let signer = HttpSigner::new(url.clone(), config.signing_token.clone(), config.signing_timeout)
                    .during(ErrorKind::Config, Stage::Configuring, "cannot set up the signing client")?;
                Some(Arc::new(signer))
            }
            None => None,
        };

        Ok(Self {
            config,
            stage: Stage::Ready,
            consumed: false,
            collector: Arc::new(Collector::new()),
            signer,
            extra_files: Vec::new(),
        })
    }

    /// Use `signer` for the manifest digest, replacing any configured signing URL
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn config(&self) -> &WaczConfig {
        &self.config
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Seed an index line. Disables indexing of the capture files.
    pub fn add_cdxj(&mut self, line: impl Into<String>) -> WaczResult<()> {
        self.ensure_open("add an index line")?;
        self.seed_entry(line.into());
        Ok(())
    }

    fn seed_entry(&mut self, mut line: String) {
        if line.trim().is_empty() {
            return;
        }
        if !line.ends_with('\n') {
            line.push('\n');
        }

        if self.config.index_from_warcs {
            debug!("index line seeded, indexing of capture files disabled");
            self.config.index_from_warcs = false;
        }
        self.collector.insert_entry(line);
    }

    /// Seed a page. Disables page detection.
    ///
    /// `title` defaults to the URL and `ts` to the configured timestamp.
    pub fn add_page(&mut self, url: &str, title: Option<String>, ts: Option<&str>) -> WaczResult<()> {
        self.ensure_open("add a page")?;

        let url = Url::parse(url)
            .map_err(|e| WaczError::config(format!("page url must be an absolute URL, got {url:?}")).with_source(e))?;
        let ts = match ts {
            Some(ts) => normalize_timestamp(ts)
                .during(ErrorKind::Config, Stage::Configuring, "page ts must be an ISO-8601 timestamp")?,
            None => self.config.ts.clone(),
        };

        if self.config.detect_pages {
            debug!("page seeded, page detection disabled");
            self.config.detect_pages = false;
        }
        self.collector.insert_page(PageEntry::new(url.to_string(), title, ts));
        Ok(())
    }

    /// Queue an extra file, stored after the capture files and listed in the manifest
    pub fn add_file(&mut self, source: impl Into<ByteSource>, path: impl Into<String>) -> WaczResult<()> {
        self.ensure_open("add a file")?;
        let path = path.into();
        let source = source.into();
        if let ByteSource::Path(file) = &source {
            if !file.is_file() {
                return Err(WaczError::config(format!("{} is not a readable file", file.display())));
            }
        }
        self.extra_files.push((source, path));
        Ok(())
    }

    /// Run the whole pipeline and write the archive
    pub async fn process(&mut self) -> WaczResult<ProcessSummary> {
        self.ensure_open("process")?;
        self.consumed = true;

        let result = self.run().await;
        if let Err(e) = &result {
            warn!(stage = %e.stage(), "processing failed, {} is incomplete", self.config.output.display());
        }
        result
    }

    async fn run(&mut self) -> WaczResult<ProcessSummary> {
        let stage = self.enter(Stage::Ready);
        if let Some(dir) = self.config.cdxj_dir.clone() {
            let lines = read_cdxj_dir(&dir)
                .await
                .during(ErrorKind::Indexing, stage, "cannot read the provided index files")?;
            info!(lines = lines.len(), dir = %dir.display(), "seeding index from directory");
            for line in lines {
                self.seed_entry(line);
            }
        }
        let mut assembler = ArchiveAssembler::create(&self.config.output)
            .await
            .during(ErrorKind::Assembly, stage, "cannot create the output file")?;

        let stage = self.enter(Stage::Indexing);
        let plan = IndexPlan {
            entries: self.config.index_from_warcs,
            pages: self.config.detect_pages,
        };
        index_all(&self.config.warcs, plan, self.config.concurrency, Arc::clone(&self.collector))
            .await
            .during(ErrorKind::Indexing, stage, "a capture file could not be indexed")?;

        self.enter(Stage::Harvesting);
        let harvest = self.collector.harvest();
        let entries = harvest.entries.len();

        let stage = self.enter(Stage::WritingIndex);
        let index = build_shared_index(&harvest.entries, SHARED_INDEX_LIMIT)
            .during(ErrorKind::Assembly, stage, "cannot build the shared index")?;
        drop(harvest.entries);
        let shards = index.shards.len();
        assembler
            .add_file(index.blob.into(), CDX_BLOB_PATH)
            .await
            .during(ErrorKind::Assembly, stage, "cannot store the index")?;
        assembler
            .add_file(index.lookup.into(), IDX_PATH)
            .await
            .during(ErrorKind::Assembly, stage, "cannot store the index lookup table")?;

        let stage = self.enter(Stage::WritingPages);
        let pages = harvest.pages.len();
        match self.config.pages_dir.clone() {
            Some(dir) => {
                if pages > 0 {
                    warn!(pages, "pages directory given, seeded pages are not written");
                }
                self.copy_pages_dir(&mut assembler, &dir, stage).await?;
            }
            None => {
                let jsonl = render_pages_jsonl(&harvest.pages)
                    .during(ErrorKind::Assembly, stage, "cannot render the page list")?;
                assembler
                    .add_file(jsonl.into(), PAGES_PATH)
                    .await
                    .during(ErrorKind::Assembly, stage, "cannot store the page list")?;
            }
        }
        drop(harvest.pages);

        let stage = self.enter(Stage::WritingCaptures);
        for warc in &self.config.warcs {
            let name = base_name(warc);
            assembler
                .add_file(warc.as_path().into(), &format!("archive/{name}"))
                .await
                .during(ErrorKind::Assembly, stage, "cannot store a capture file")?;
        }
        for (source, path) in std::mem::take(&mut self.extra_files) {
            assembler
                .add_file(source, &path)
                .await
                .during(ErrorKind::Assembly, stage, "cannot store an extra file")?;
        }

        let stage = self.enter(Stage::WritingManifest);
        let resources = assembler.resources().to_vec();
        let package = self.datapackage(resources.clone());
        let json = package
            .to_json()
            .during(ErrorKind::Assembly, stage, "cannot serialize the manifest")?;
        let manifest = assembler
            .add_file(json.into(), DATAPACKAGE_PATH)
            .await
            .during(ErrorKind::Assembly, stage, "cannot store the manifest")?;

        let stage = self.enter(Stage::WritingDigest);
        let signed_data = match &self.signer {
            Some(signer) => {
                // The signature must cover the manifest's own timestamp
                let envelope = signer
                    .sign(&manifest.hash, &package.created)
                    .await
                    .during(ErrorKind::Signing, stage, "the manifest could not be signed")?;
                info!(domain = %envelope.domain, "manifest signed");
                Some(envelope)
            }
            None => None,
        };
        let signed = signed_data.is_some();
        let digest = DatapackageDigest::new(manifest.hash, signed_data)
            .to_json()
            .during(ErrorKind::Assembly, stage, "cannot serialize the manifest digest")?;
        assembler
            .add_untracked(digest.as_bytes(), DATAPACKAGE_DIGEST_PATH)
            .await
            .during(ErrorKind::Assembly, stage, "cannot store the manifest digest")?;

        let stage = self.enter(Stage::Finalizing);
        assembler
            .finalize()
            .await
            .during(ErrorKind::Assembly, stage, "cannot finish the archive")?;

        self.enter(Stage::Done);
        info!(output = %self.config.output.display(), entries, pages, shards, "WACZ file ready");

        Ok(ProcessSummary {
            output: self.config.output.clone(),
            warcs: self.config.warcs.len(),
            entries,
            pages,
            shards,
            resources,
            signed,
        })
    }

    fn datapackage(&self, resources: Vec<ResourceEntry>) -> Datapackage {
        let mut package = Datapackage::new(resources, Utc::now());
        package.title = self
            .config
            .title
            .clone()
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());
        package.description = self.config.description.clone();
        if let Some(url) = &self.config.url {
            package.main_page_url = Some(url.clone());
            package.main_page_date = Some(self.config.ts.clone());
        }
        package.extras = self.config.datapackage_extras.clone();
        package
    }

    async fn copy_pages_dir<W>(
        &self,
        assembler: &mut ArchiveAssembler<W>,
        dir: &Path,
        stage: Stage,
    ) -> WaczResult<()>
    where
        W: tokio::io::AsyncWrite + tokio::io::AsyncSeek + Unpin,
    {
        let files = collect_pages_files(dir)
            .await
            .during(ErrorKind::Assembly, stage, "cannot read the pages directory")?;
        for file in files {
            let name = base_name(&file);
            assembler
                .add_file(file.as_path().into(), &format!("pages/{name}"))
                .await
                .during(ErrorKind::Assembly, stage, "cannot store a page list")?;
        }
        Ok(())
    }

    fn enter(&mut self, stage: Stage) -> Stage {
        debug!(from = ?self.stage, to = ?stage, "stage");
        info!("{}", stage);
        self.stage = stage;
        stage
    }

    fn ensure_open(&self, action: &str) -> WaczResult<()> {
        if self.consumed {
            return Err(WaczError::misuse(
                self.stage,
                format!("cannot {action}: this archive has already been processed"),
            ));
        }
        Ok(())
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}
