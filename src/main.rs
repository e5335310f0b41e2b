use std::process;
use std::sync::Arc;

use apalis::{
    layers::WorkerBuilderExt,
    prelude::{Monitor, WorkerBuilder, WorkerFactoryFn},
};
use apalis_cron::CronStream;
use time::OffsetDateTime;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

use stillpoint::{
    application::{
        admin::AdminGatewayService,
        content::ContentResolver,
        error::AppError,
        jobs::{SweepWorkerContext, process_publish_sweep_job, publish_sweep_schedule},
        notify::{EmailClient, NotificationDispatcher},
        repos::{AutomationLogRepo, PostsRepo, PostsWriteRepo, SubscribersRepo},
    },
    config,
    domain::{journal, practice},
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{AdminHttpState, PublicState, build_admin_router, build_public_router},
        local::{JOURNAL_NAMESPACE, JournalDocument, LocalStore, PRACTICE_NAMESPACE, PracticeDocument},
        telemetry,
    },
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Practice(args) => run_practice(&settings, args),
        config::Command::Journal(args) => run_journal(&settings, args),
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    if settings.admin.password.trim().is_empty() {
        return Err(AppError::from(InfraError::configuration(
            "admin.password must be set before serving",
        )));
    }

    let (http_repositories, job_repositories) = init_repositories(&settings).await?;

    let reader: Arc<dyn PostsRepo> = http_repositories.clone();
    let writer: Arc<dyn PostsWriteRepo> = http_repositories.clone();
    let subscribers: Arc<dyn SubscribersRepo> = job_repositories.clone();
    let audit: Arc<dyn AutomationLogRepo> = job_repositories.clone();

    let gateway = Arc::new(AdminGatewayService::new(
        reader.clone(),
        writer,
        settings.admin.password.clone(),
    ));
    let content = Arc::new(ContentResolver::new(reader));

    let email = match (&settings.notify.email_api_url, &settings.notify.email_api_token) {
        (Some(url), Some(token)) => Some(EmailClient::new(
            url.clone(),
            settings.notify.email_sender.clone(),
            token.clone(),
        )),
        _ => None,
    };
    let notifications = Arc::new(NotificationDispatcher::new(
        subscribers,
        audit,
        email,
        settings.site.public_url.clone(),
    ));

    let monitor_handle = spawn_sweep_monitor(
        job_repositories,
        notifications,
        &settings.sweep.schedule,
    )?;

    let result = serve_http(&settings, gateway, content, http_repositories).await;

    monitor_handle.abort();
    let _ = monitor_handle.await;

    result
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<(Arc<PostgresRepositories>, Arc<PostgresRepositories>), AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let http_pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&http_pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    let jobs_pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok((
        Arc::new(PostgresRepositories::new(http_pool)),
        Arc::new(PostgresRepositories::new(jobs_pool)),
    ))
}

fn spawn_sweep_monitor(
    repositories: Arc<PostgresRepositories>,
    notifications: Arc<NotificationDispatcher>,
    schedule_expression: &str,
) -> Result<tokio::task::JoinHandle<()>, AppError> {
    let schedule = publish_sweep_schedule(schedule_expression).map_err(AppError::validation)?;

    let context = SweepWorkerContext {
        repositories,
        notifications,
    };

    let sweep_worker = WorkerBuilder::new("publish-sweep-worker")
        .data(context)
        .backend(CronStream::new(schedule))
        .build_fn(process_publish_sweep_job);

    let monitor = Monitor::new().register(sweep_worker);

    Ok(tokio::spawn(async move {
        if let Err(err) = monitor.run().await {
            error!(error = %err, "sweep monitor stopped");
        }
    }))
}

async fn serve_http(
    settings: &config::Settings,
    gateway: Arc<AdminGatewayService>,
    content: Arc<ContentResolver>,
    db: Arc<PostgresRepositories>,
) -> Result<(), AppError> {
    let public_router = build_public_router(PublicState { content, db });
    let admin_router = build_admin_router(AdminHttpState { gateway });
    let router = public_router.merge(admin_router);

    let addr = settings
        .server
        .addr()
        .map_err(|err| AppError::unexpected(err.to_string()))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(target = "stillpoint::serve", %addr, "listening");

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

fn run_practice(settings: &config::Settings, args: config::PracticeArgs) -> Result<(), AppError> {
    let store = LocalStore::new(&settings.local.data_dir).map_err(AppError::from)?;
    let mut document: PracticeDocument = store.load(PRACTICE_NAMESPACE);
    let today = OffsetDateTime::now_utc().date();

    match args.command {
        config::PracticeCommand::Toggle { practice_id, date } => {
            let date = match date {
                Some(raw) => {
                    practice::parse_entry_date(&raw)
                        .ok_or_else(|| AppError::validation(format!("invalid date `{raw}`")))?;
                    raw
                }
                None => today
                    .format(&time::macros::format_description!("[year]-[month]-[day]"))
                    .map_err(|err| AppError::unexpected(err.to_string()))?,
            };

            let completed = practice::toggle_entry(&mut document.entries, &practice_id, &date);
            let stats =
                practice::compute_progress(&document.entries, document.longest_streak, today);
            document.longest_streak = stats.longest_streak;
            store.save(PRACTICE_NAMESPACE, &document)?;

            println!(
                "{practice_id} on {date}: {}",
                if completed { "completed" } else { "not completed" }
            );
            println!("current streak: {} day(s)", stats.current_streak);
        }
        config::PracticeCommand::Stats => {
            let stats =
                practice::compute_progress(&document.entries, document.longest_streak, today);
            document.longest_streak = stats.longest_streak;
            store.save(PRACTICE_NAMESPACE, &document)?;

            println!("sessions:       {}", stats.total_sessions);
            println!("minutes:        {}", stats.total_minutes);
            println!("current streak: {}", stats.current_streak);
            println!("longest streak: {}", stats.longest_streak);
            println!("last 7 days:    {}", stats.this_week_sessions);
        }
    }

    Ok(())
}

fn run_journal(settings: &config::Settings, args: config::JournalArgs) -> Result<(), AppError> {
    let store = LocalStore::new(&settings.local.data_dir).map_err(AppError::from)?;
    let mut document: JournalDocument = store.load(JOURNAL_NAMESPACE);

    match args.command {
        config::JournalCommand::Add { body, title, tags } => {
            let entry = journal::JournalEntry::new(title, body, tags);
            let id = entry.id;
            document.entries.push(entry);
            store.save(JOURNAL_NAMESPACE, &document)?;
            println!("recorded entry {id}");
        }
        config::JournalCommand::List { filter } => {
            let matches =
                journal::filter_entries(&document.entries, filter.as_deref().unwrap_or(""));
            for entry in matches {
                let title = entry.title.as_deref().unwrap_or("(untitled)");
                let tags = if entry.tags.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", entry.tags.join(", "))
                };
                println!("{} {title}{tags}", entry.created_at.date());
                println!("  {}", entry.body);
            }
        }
    }

    Ok(())
}
