use std::process::ExitCode;

use clap::Parser;

use tailstat_core::config::TailstatConfig;
use tailstat_daemon::cli::DaemonCli;
use tailstat_daemon::{logging, orchestrator::Orchestrator};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = DaemonCli::parse();

    // 설정 로드 (파일 + 환경변수)
    let mut config = match TailstatConfig::load(&cli.config).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load config {}: {}", cli.config.display(), e);
            return ExitCode::FAILURE;
        }
    };

    // CLI 오버라이드 적용 (최고 우선순위)
    if let Some(log_level) = cli.log_level {
        config.general.log_level = log_level;
    }
    if let Some(log_format) = cli.log_format {
        config.general.log_format = log_format;
    }
    if let Some(pid_file) = cli.pid_file {
        config.general.pid_file = pid_file;
    }

    if let Err(e) = config.validate() {
        eprintln!("invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    // --validate: 설정 검증만 수행하고 종료
    if cli.validate {
        println!("configuration OK: {}", cli.config.display());
        return ExitCode::SUCCESS;
    }

    // 로깅 초기화
    if let Err(e) = logging::init_tracing(&config.general) {
        eprintln!("failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "tailstat-daemon starting"
    );

    // 오케스트레이터 빌드 및 실행
    let mut orchestrator = match Orchestrator::build_from_config(config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize daemon");
            return ExitCode::FAILURE;
        }
    };

    match orchestrator.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // 시작 전 부트스트랩 실패만 여기 도달 — 비정상 종료 코드로
            // 상위 오케스트레이터(systemd, k8s)가 재시작하도록 함
            tracing::error!(error = %e, "daemon exited with error");
            ExitCode::FAILURE
        }
    }
}
