use std::{error::Error, sync::Arc};

use foodgram::{
    actions::{connect, migrate, PgRepository},
    config::Config,
    routes,
    store::SharedRepository,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::load()?;

    let pool = connect(&config).await?;
    migrate(&pool).await?;
    log::info!("Database migrations applied");

    let repo: SharedRepository = Arc::new(PgRepository::new(pool));
    let api = routes::api(repo, config.jwt_secret.clone());

    log::info!("Starting HTTP server at http://{}", config.address);
    warp::serve(api).run(config.address).await;

    Ok(())
}
