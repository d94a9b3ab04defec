//! Core application

use std::path::Path;

use anyhow::{Context, Result};

use crate::core::cli::{self, Commands, FieldCommands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::data::BackendService;
use crate::domain::filters::save::validate_full;
use crate::domain::filters::{
    BuilderSession, CustomFieldError, CustomFieldRequest, FieldCatalog, FilterContext,
    FilterDefinition, FilterExpression, SaveError, SaveMode,
};
use crate::utils::file::read_json;

pub struct CoreApp {
    pub config: AppConfig,
    pub backend: BackendService,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        let Some(command) = command else {
            cli::print_help()?;
            return Ok(());
        };

        let config = AppConfig::load(&cli_config)?;
        let backend = BackendService::init(&config.backend)?;
        let app = Self { config, backend };

        match command {
            Commands::Catalog { context, search } => {
                app.list_catalog(context, search.as_deref()).await
            }
            Commands::Field {
                command:
                    FieldCommands::Create {
                        label,
                        data_type,
                        operator,
                        context,
                    },
            } => {
                let request = CustomFieldRequest {
                    label,
                    data_type,
                    operator,
                };
                app.create_field(&request, context).await
            }
            Commands::Validate { path, edit } => app.validate(&path, edit).await,
            Commands::Estimate { path } => app.estimate(&path).await,
            Commands::Save { path, draft, edit } => app.save(&path, draft, edit).await,
            Commands::Show { id } => app.show(&id).await,
        }
    }

    async fn start_session(&self) -> Result<BuilderSession> {
        BuilderSession::start(self.backend.provider(), self.config.session_settings())
            .await
            .with_context(|| format!("Failed to load catalog from {} backend", self.backend.name()))
    }

    /// Start a session and replay a definition file into it
    async fn build(&self, path: &Path) -> Result<(BuilderSession, FilterDefinition)> {
        let definition: FilterDefinition = read_json(path)?;
        let mut session = self.start_session().await?;
        definition
            .replay(&mut session)
            .with_context(|| format!("Failed to build filter from {}", path.display()))?;
        Ok((session, definition))
    }

    async fn list_catalog(&self, context: FilterContext, search: Option<&str>) -> Result<()> {
        let entries = self
            .backend
            .provider()
            .fetch_catalog()
            .await
            .context("Failed to fetch catalog")?;
        let catalog = FieldCatalog::from_entries(entries);

        let fields = match search {
            Some(term) => catalog.search(context, term),
            None => catalog.fields(context).collect(),
        };

        println!("{} fields ({}):", context, fields.len());
        for field in fields {
            let operators: Vec<&str> = field
                .allowed_operators()
                .iter()
                .map(|op| op.as_str())
                .collect();
            println!(
                "  {:<24} {:<28} {:<8} {}",
                field.key(),
                field.label(),
                field.data_type().as_str(),
                operators.join(", ")
            );
        }

        let counts = catalog.type_counts(context);
        println!(
            "\nstring: {}  number: {}  date: {}",
            counts.string, counts.number, counts.date
        );
        Ok(())
    }

    async fn create_field(&self, request: &CustomFieldRequest, context: FilterContext) -> Result<()> {
        let mut session = self.start_session().await?;
        session.switch_context(context)?;

        match session.create_custom_field(request).await {
            Ok(()) => {
                println!(
                    "Created criteria block '{}' ({} fields in catalog)",
                    request.label.trim(),
                    session.catalog().len()
                );
                Ok(())
            }
            Err(CustomFieldError::Invalid(messages)) => {
                anyhow::bail!("Invalid criteria block:\n  {}", messages.join("\n  "))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn validate(&self, path: &Path, edit: bool) -> Result<()> {
        let (session, definition) = self.build(path).await?;

        print_expression(session.workspace().active_context(), session.workspace().active());
        if let Err(errors) = validate_full(session.workspace().active(), &definition.details, edit)
        {
            anyhow::bail!(
                "Validation failed at {} stage:\n  {}",
                errors.stage,
                errors.messages.join("\n  ")
            );
        }
        println!("Filter is valid");
        Ok(())
    }

    async fn estimate(&self, path: &Path) -> Result<()> {
        let (mut session, _) = self.build(path).await?;
        let estimate = session.settle_estimate().await;

        print_expression(session.workspace().active_context(), session.workspace().active());
        println!("Estimated audience: {}", estimate);
        Ok(())
    }

    async fn save(&self, path: &Path, draft: bool, edit: Option<String>) -> Result<()> {
        let (mut session, definition) = self.build(path).await?;
        if let Some(filter_id) = edit {
            session.set_mode(SaveMode::Edit { filter_id });
        }
        session.settle_estimate().await;

        let result = if draft {
            session.save_draft(&definition.details).await
        } else {
            session.save(&definition.details).await
        };

        match result {
            Ok(outcome) => {
                println!("Saved filter {}", outcome.filter_id);
                println!("{}", serde_json::to_string_pretty(&outcome.filter)?);
                Ok(())
            }
            Err(SaveError::Validation(errors)) => anyhow::bail!(
                "Validation failed at {} stage:\n  {}",
                errors.stage,
                errors.messages.join("\n  ")
            ),
            Err(e @ SaveError::Persistence(_)) => Err(e.into()),
        }
    }

    async fn show(&self, id: &str) -> Result<()> {
        let session =
            BuilderSession::open(self.backend.provider(), self.config.session_settings(), id)
                .await
                .with_context(|| format!("Failed to load filter {}", id))?;

        let expression = session.workspace().active();
        print_expression(session.workspace().active_context(), expression);
        println!("Stored audience estimate: {}", expression.estimated_audience());
        Ok(())
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }
}

fn print_expression(context: FilterContext, expression: &FilterExpression) {
    println!("Context: {}", context);
    println!("Groups:  {}", expression.groups().len());
    println!("Filter:  {}", expression);
}
