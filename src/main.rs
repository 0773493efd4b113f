use subscribe_proxy::{configuration, startup::Application, telemetry::Telemetry};

#[actix_web::main]
async fn main() -> Result<(), std::io::Error> {
    Telemetry::create("subscribe-proxy".into(), "info".into(), std::io::stdout);

    let configuration = configuration::get_configuration().expect("Failed to read configuration");
    let application = Application::build_server(configuration).await?;
    application.run_application().await
}
