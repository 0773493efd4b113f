use actix_web::{dev::Server, web, App, HttpServer};
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

use crate::configuration::Settings;
use crate::mailchimp::MailchimpClient;
use crate::routes::{health_check, subscriptions};

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build_server(configuration: Settings) -> Result<Self, std::io::Error> {
        let mailchimp_client = MailchimpClient::new(
            configuration.mailchimp.api_base_url(),
            configuration.mailchimp.audience_id.clone(),
            configuration.mailchimp.api_key.clone(),
            configuration.mailchimp.timeout(),
        );

        let address = format!(
            "{}:{}",
            configuration.application.address, configuration.application.port
        );
        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();
        let server = run(listener, mailchimp_client)?;

        Ok(Self { port, server })
    }

    pub fn get_application_port(&self) -> u16 {
        self.port
    }

    pub async fn run_application(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn run(listener: TcpListener, mailchimp_client: MailchimpClient) -> Result<Server, std::io::Error> {
    // Wrap the client in web::Data, that ends up as an Arc pointer
    let mailchimp_client = web::Data::new(mailchimp_client);
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check::health_check))
            .service(
                // Anything but POST gets the proxy's own 405 body instead of
                // the framework default
                web::resource("/subscribe")
                    .route(web::post().to(subscriptions::subscribe))
                    .default_service(web::route().to(subscriptions::method_not_allowed)),
            )
            .app_data(mailchimp_client.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
