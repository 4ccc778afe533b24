//! Main analysis orchestrator for Sealed Guardian
//!
//! Architecture: Domain Services - Analyzer orchestrates the validation workflow
//! - Discovers sources, parses them, indexes declared types, then classifies every class
//! - Resolution needs every file's declarations, so parsing completes before classification
//! - Sources elsewhere in the enclosing project are indexed too, but never classified
//! - Handles parallel processing and error recovery gracefully

pub mod classifier;
pub mod marker;

pub use classifier::Classifier;
pub use marker::MarkerResolver;

use crate::config::GuardianConfig;
use crate::domain::classification::ClassificationResult;
use crate::domain::marker::DESIGNED_FOR_INHERITANCE;
use crate::domain::violations::{GuardianError, GuardianResult, ValidationReport, Violation};
use crate::fix::{BatchFixer, BatchOutcome, Transformer};
use crate::paths::{find_project_root, is_source_file, PathFilter};
use crate::semantic::TypeIndex;
use crate::syntax::{CSharpParser, SourceDocument};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Main analyzer that orchestrates the entire validation process
pub struct Analyzer {
    /// Configuration for this analysis
    config: GuardianConfig,
    /// Path filter for determining which files to analyze
    path_filter: PathFilter,
    classifier: Classifier,
    transformer: Transformer,
}

/// Options for customizing analysis behavior
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Whether to use parallel processing
    pub parallel: bool,
    /// Maximum number of files to analyze
    pub max_files: Option<usize>,
    /// Whether to stop at the first unreadable file
    pub fail_fast: bool,
    /// Additional paths to exclude (temporary)
    pub exclude_patterns: Vec<String>,
    /// Whether to ignore per-directory ignore files
    pub ignore_ignore_files: bool,
    /// Index other sources of the enclosing project so their declarations take part in binding
    pub project_context: bool,
    /// Project directory to index; detected from the first requested path when unset
    pub project_root: Option<PathBuf>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            max_files: None,
            fail_fast: false,
            exclude_patterns: Vec::new(),
            ignore_ignore_files: false,
            project_context: true,
            project_root: None,
        }
    }
}

/// One parsed file and the classification of each of its classes
#[derive(Debug, Clone)]
pub struct FileAnalysis {
    pub document: SourceDocument,
    pub classifications: Vec<ClassificationResult>,
}

impl FileAnalysis {
    pub fn violations(&self) -> impl Iterator<Item = &ClassificationResult> {
        self.classifications.iter().filter(|c| c.is_violation())
    }
}

/// Every file of one run, classified against a shared type index
#[derive(Debug)]
pub struct ProjectAnalysis {
    pub files: Vec<FileAnalysis>,
    pub index: TypeIndex,
}

impl ProjectAnalysis {
    pub fn total_classes(&self) -> usize {
        self.files.iter().map(|f| f.classifications.len()).sum()
    }
}

impl Analyzer {
    /// Create a new analyzer with the given configuration
    pub fn new(config: GuardianConfig) -> GuardianResult<Self> {
        config.validate()?;

        let ignore_file = if config.paths.ignore_file.as_deref() == Some("") {
            None
        } else {
            config.paths.ignore_file.clone()
        };

        let path_filter = PathFilter::new(config.paths.patterns.clone(), ignore_file)
            .map_err(|e| GuardianError::config(format!("Failed to create path filter: {e}")))?;

        Ok(Self {
            config,
            path_filter,
            classifier: Classifier::new(DESIGNED_FOR_INHERITANCE),
            transformer: Transformer::new(DESIGNED_FOR_INHERITANCE),
        })
    }

    /// Create an analyzer with default configuration
    pub fn with_defaults() -> GuardianResult<Self> {
        Self::new(GuardianConfig::default())
    }

    pub fn config(&self) -> &GuardianConfig {
        &self.config
    }

    /// Source files selected by `paths` after filtering
    pub fn discover<P: AsRef<Path>>(
        &self,
        paths: &[P],
        options: &AnalysisOptions,
    ) -> GuardianResult<Vec<PathBuf>> {
        let mut filter = self.path_filter.clone();
        if options.ignore_ignore_files {
            filter = filter.without_ignore_files();
        }
        for pattern in &options.exclude_patterns {
            filter.add_pattern(pattern.clone())?;
        }

        let mut files = Vec::new();
        for path in paths {
            let path = path.as_ref();
            if path.is_file() {
                if is_source_file(path) && filter.should_analyze(path)? {
                    files.push(path.to_path_buf());
                }
            } else if path.is_dir() {
                files.extend(filter.find_files(path)?);
            } else {
                tracing::warn!("Skipping missing path {}", path.display());
            }
        }

        files.sort();
        files.dedup();
        if let Some(max_files) = options.max_files {
            files.truncate(max_files);
        }

        Ok(files)
    }

    /// Read and parse files, one parser per worker
    pub fn parse_files(
        &self,
        files: &[PathBuf],
        options: &AnalysisOptions,
    ) -> GuardianResult<Vec<SourceDocument>> {
        let results: Vec<(PathBuf, GuardianResult<SourceDocument>)> =
            if options.parallel && files.len() > 1 {
                files
                    .par_iter()
                    .map_init(CSharpParser::new, |parser, path| {
                        let result = match parser {
                            Ok(parser) => read_and_parse(parser, path),
                            Err(e) => Err(GuardianError::parse(
                                path.display().to_string(),
                                e.to_string(),
                            )),
                        };
                        (path.clone(), result)
                    })
                    .collect()
            } else {
                let mut parser = CSharpParser::new()?;
                files
                    .iter()
                    .map(|path| (path.clone(), read_and_parse(&mut parser, path)))
                    .collect()
            };

        let mut documents = Vec::with_capacity(results.len());
        for (path, result) in results {
            match result {
                Ok(document) => documents.push(document),
                Err(e) if options.fail_fast => return Err(e),
                Err(e) => tracing::warn!("Failed to analyze {}: {}", path.display(), e),
            }
        }

        Ok(documents)
    }

    /// Parsed project sources outside the requested set, for the type index only
    pub fn context_documents<P: AsRef<Path>>(
        &self,
        paths: &[P],
        requested: &[PathBuf],
        options: &AnalysisOptions,
    ) -> GuardianResult<Vec<SourceDocument>> {
        if !options.project_context {
            return Ok(Vec::new());
        }
        let root = match &options.project_root {
            Some(root) => root.clone(),
            None => match paths.first().and_then(|path| find_project_root(path.as_ref())) {
                Some(root) => root,
                None => return Ok(Vec::new()),
            },
        };

        let context_options = AnalysisOptions {
            max_files: None,
            fail_fast: false,
            ..options.clone()
        };
        let requested: HashSet<PathBuf> = requested.iter().map(|f| canonical(f)).collect();
        let extra: Vec<PathBuf> = self
            .discover(&[&root], &context_options)?
            .into_iter()
            .filter(|file| !requested.contains(&canonical(file)))
            .collect();
        if extra.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(
            "Indexing {} project files under {}",
            extra.len(),
            root.display()
        );
        self.parse_files(&extra, &context_options)
    }

    /// Classify every class in `documents` against an index of all of them
    pub fn analyze_documents(
        &self,
        documents: Vec<SourceDocument>,
        parallel: bool,
    ) -> GuardianResult<ProjectAnalysis> {
        self.analyze_documents_with_context(documents, &[], parallel)
    }

    /// Classify `documents`; `context` only contributes declarations to the index
    pub fn analyze_documents_with_context(
        &self,
        documents: Vec<SourceDocument>,
        context: &[SourceDocument],
        parallel: bool,
    ) -> GuardianResult<ProjectAnalysis> {
        let index = TypeIndex::from_documents(
            documents.iter().chain(context),
            &self.config.metadata_references,
        )?;

        let classify = |document: SourceDocument| self.classify_document(document, &index);
        let files: Vec<FileAnalysis> = if parallel && documents.len() > 1 {
            documents.into_par_iter().map(classify).collect()
        } else {
            documents.into_iter().map(classify).collect()
        };

        Ok(ProjectAnalysis { files, index })
    }

    fn classify_document(&self, document: SourceDocument, index: &TypeIndex) -> FileAnalysis {
        let classifications = if self.config.rule.enabled {
            document
                .root
                .classes()
                .iter()
                .filter_map(|class| self.classifier.classify(class, index))
                .collect()
        } else {
            Vec::new()
        };

        tracing::debug!(
            "Classified {} classes in {}",
            classifications.len(),
            document.path.display()
        );

        FileAnalysis {
            document,
            classifications,
        }
    }

    /// Discover, parse and classify everything under `paths`
    pub fn analyze_project<P: AsRef<Path>>(
        &self,
        paths: &[P],
        options: &AnalysisOptions,
    ) -> GuardianResult<ProjectAnalysis> {
        let files = self.discover(paths, options)?;
        let documents = self.parse_files(&files, options)?;
        let context = self.context_documents(paths, &files, options)?;
        self.analyze_documents_with_context(documents, &context, options.parallel)
    }

    /// Analyze in-memory sources as one project
    pub fn analyze_sources<I, P, S>(&self, sources: I) -> GuardianResult<ProjectAnalysis>
    where
        I: IntoIterator<Item = (P, S)>,
        P: AsRef<Path>,
        S: AsRef<str>,
    {
        let mut parser = CSharpParser::new()?;
        let documents = sources
            .into_iter()
            .map(|(path, text)| parser.parse_document(path, text.as_ref()))
            .collect::<GuardianResult<Vec<_>>>()?;
        self.analyze_documents(documents, false)
    }

    /// Analyze multiple paths and return a complete validation report
    pub fn analyze_paths<P: AsRef<Path>>(
        &self,
        paths: &[P],
        options: &AnalysisOptions,
    ) -> GuardianResult<ValidationReport> {
        let start_time = Instant::now();
        let analysis = self.analyze_project(paths, options)?;

        let mut report = self.report(&analysis);
        report.set_execution_time(start_time.elapsed().as_millis() as u64);
        Ok(report)
    }

    /// Analyze a directory tree and return a validation report
    pub fn analyze_directory<P: AsRef<Path>>(
        &self,
        root: P,
        options: &AnalysisOptions,
    ) -> GuardianResult<ValidationReport> {
        self.analyze_paths(&[root.as_ref()], options)
    }

    /// Build a report from a finished analysis
    pub fn report(&self, analysis: &ProjectAnalysis) -> ValidationReport {
        let mut report = ValidationReport::new();
        for file in &analysis.files {
            for violation in self.violations_for(file) {
                report.add_violation(violation);
            }
        }

        report.set_files_analyzed(analysis.files.len());
        report.set_classes_analyzed(analysis.total_classes());
        report.set_config_fingerprint(self.config.fingerprint());
        report.sort_violations();
        report
    }

    /// Render a file's non-passing classifications as violations
    pub fn violations_for(&self, file: &FileAnalysis) -> Vec<Violation> {
        let document = &file.document;
        file.violations()
            .filter_map(|classification| {
                let descriptor = classification.kind.descriptor()?;
                let suggestion = self
                    .transformer
                    .code_fix_for(document, classification)
                    .map_or(descriptor.remedy, |fix| fix.title);

                Some(
                    Violation::new(
                        descriptor.id,
                        self.config.severity_for(classification.kind),
                        document.path.clone(),
                        descriptor.format_message(&classification.class_name),
                    )
                    .with_position(classification.identifier.line, classification.identifier.column)
                    .with_class(classification.class_name.as_str())
                    .with_context(document.line_at(classification.identifier.span.start))
                    .with_suggestion(suggestion),
                )
            })
            .collect()
    }

    /// Apply every available fix to one analyzed file
    pub fn fix_file(&self, file: &FileAnalysis) -> GuardianResult<BatchOutcome> {
        BatchFixer::new(self.transformer).fix_document(&file.document, &file.classifications)
    }

    /// Get configuration fingerprint recorded in reports
    pub fn config_fingerprint(&self) -> String {
        self.config.fingerprint()
    }
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn read_and_parse(parser: &mut CSharpParser, path: &Path) -> GuardianResult<SourceDocument> {
    let content = fs::read_to_string(path).map_err(|e| {
        GuardianError::analysis(path.display().to_string(), format!("Failed to read file: {e}"))
    })?;
    tracing::debug!("Parsing {}", path.display());
    parser.parse_document(path, &content)
}
