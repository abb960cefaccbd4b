#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tabula::run().await
}
