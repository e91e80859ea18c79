use docverify_core::{
    api,
    classifier::KeywordClassifier,
    config::Config,
    orchestrator::Verifier,
    registry::LogoRegistry,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ----------------------------------------------------------------
    // 0. 加载配置
    // ----------------------------------------------------------------
    let config = Config::from_env()?;
    info!(
        "⚙️  配置加载完成: Host={}:{}, LogoDir={}, MaxUpload={}B, Policy={:?}, NoiseThreshold={}, MaxPixels={}",
        config.host,
        config.port,
        config.logo_dir.display(),
        config.max_upload_bytes,
        config.failure_policy,
        config.noise_threshold,
        config.max_image_pixels
    );

    // ----------------------------------------------------------------
    // 1. 构建 logo 指纹库（只构建这一次，之后只读）
    // ----------------------------------------------------------------
    info!("🛡️ 文档核验服务启动中...");
    let logo_dir = config.logo_dir.clone();
    let registry = tokio::task::spawn_blocking(move || LogoRegistry::build(&logo_dir)).await?;
    for (identity, fp) in registry.iter() {
        info!("🔖 {} = {}", identity, fp);
    }

    // ----------------------------------------------------------------
    // 2. 状态共享容器
    // ----------------------------------------------------------------
    let verifier = Verifier::new(Arc::new(registry))
        .with_failure_policy(config.failure_policy)
        .with_noise_threshold(config.noise_threshold)
        .with_max_image_pixels(config.max_image_pixels);
    let shared_state = Arc::new(api::AppState {
        verifier: Arc::new(verifier),
        classifier: Arc::new(KeywordClassifier),
        max_upload_bytes: config.max_upload_bytes,
        classifier_timeout: config.classifier_timeout,
    });

    // ----------------------------------------------------------------
    // 3. 启动 HTTP 服务
    // ----------------------------------------------------------------
    let app = api::app(shared_state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;

    info!("🚀 API 服务已运行在: http://{}", addr);
    info!("   - POST /verify      : 上传文档进行伪造检测");
    info!("   - GET  /logo-hashes : 导出 logo 指纹库");

    axum::serve(listener, app).await?;

    Ok(())
}
