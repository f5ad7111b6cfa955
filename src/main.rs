use actix_web::{web, App, HttpServer};
use clap::Parser;

mod api;
mod cli;
mod models;
mod services;
mod state;

use cli::CommandArgs;
use state::new_state;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // .env 不覆盖已有环境变量，需在解析参数之前加载
    let dotenv_result = dotenvy::dotenv();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match dotenv_result {
        Ok(path) => log::info!("Loaded environment from {:?}", path),
        Err(e) if e.not_found() => log::debug!("No .env file found"),
        Err(e) => log::warn!("Failed to load .env file: {}", e),
    }

    let args = CommandArgs::parse();
    let bind_address = format!("{}:{}", args.address, args.port);

    for program in args.programs() {
        match &program.command {
            Some(cmd) => log::info!("  {} -> {}", program.name, cmd),
            None => log::warn!("  {} has no executable configured, start will fail", program.name),
        }
    }

    let state = new_state(&args);

    print_banner(&args);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(api::configure)
    })
        .bind(&bind_address)?
        .run()
        .await
}

fn print_banner(args: &CommandArgs) {
    println!("╔═══════════════════════════════════════════════════════════╗");
    println!("║      Geo Supervisor v0.1.0                                ║");
    println!("║      CALC / DB / SIM process control                      ║");
    println!("╚═══════════════════════════════════════════════════════════╝");
    println!();
    println!("🚀 Server starting on http://{}:{}", args.address, args.port);
    println!();
    println!("📋 Available endpoints:");
    println!("  POST   /api/process/start      - Start CALC, DB, SIM");
    println!("  POST   /api/process/stop       - Stop tracked processes");
    println!("  POST   /api/process/status     - Process run state");
    println!("  GET    /api/coords             - Towers and device location from log");
    println!("  GET    /health                 - Health check");
    println!();
    println!("💾 PID file: {}", args.pid_file.display());
    println!("📄 Log file: {}", args.log_path.display());
    println!("═══════════════════════════════════════════════════════════");
}
