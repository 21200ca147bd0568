use actix_web::{App, HttpRequest, HttpResponse, HttpServer, Responder, delete, get, put, web};
use log::info;
use serde::Deserialize;

use markov_core::commands::user_message;
use markov_core::fanfic::Pairing;
use markov_core::updater::UpdateBatch;
use markov_core::{Commands, Config, MarkovError};

/// Header carrying the identity of the caller for administrative commands.
const OPERATOR_HEADER: &str = "X-Operator";

/// Query parameters for `/v1/markov`
#[derive(Deserialize)]
struct MarkovParams {
	person: Option<String>,
	root: Option<String>,
	repository: Option<String>,
}

#[derive(Deserialize)]
struct CorporaParams {
	repository: Option<String>,
}

#[derive(Deserialize)]
struct FanficParams {
	person1: Option<String>,
	person2: Option<String>,
	pairing: Option<String>,
}

#[derive(Deserialize)]
struct RenameParams {
	old: String,
	new: String,
}

#[derive(Deserialize)]
struct MergeParams {
	a: String,
	b: String,
	out: String,
}

#[derive(Deserialize)]
struct RemoveParams {
	name: String,
}

fn operator(request: &HttpRequest) -> &str {
	request.headers().get(OPERATOR_HEADER).and_then(|value| value.to_str().ok()).unwrap_or_default()
}

/// Maps a failed command to a status code, keeping the chat message as body.
fn error_response(err: &MarkovError) -> HttpResponse {
	let body = user_message(err);
	match err {
		MarkovError::PermissionDenied => HttpResponse::Forbidden().body(body),
		MarkovError::NameNotFound(_) | MarkovError::FileNotFound(_) | MarkovError::UnknownRepository(_) => {
			HttpResponse::NotFound().body(body)
		}
		MarkovError::NameTaken(_) => HttpResponse::Conflict().body(body),
		MarkovError::TooManyInputs(_)
		| MarkovError::AmbiguousInput { .. }
		| MarkovError::InvalidName(_)
		| MarkovError::InsufficientData => HttpResponse::UnprocessableEntity().body(body),
		_ => HttpResponse::InternalServerError().body(body),
	}
}

/// HTTP GET endpoint `/v1/markov`
///
/// Returns `{"text", "label"}`. Failures are replies too, shown under the
/// default label, so the host can post them as they are. `repository`
/// selects a corpus repository other than the primary one.
#[get("/v1/markov")]
async fn get_markov(commands: web::Data<Commands>, query: web::Query<MarkovParams>) -> impl Responder {
	let person = match &query.person {
		Some(person) if !person.trim().is_empty() => person.trim(),
		_ => return HttpResponse::BadRequest().body("Missing or empty person"),
	};
	HttpResponse::Ok().json(commands.generate_reply(query.repository.as_deref(), person, query.root.as_deref()))
}

#[get("/v1/corpora")]
async fn get_corpora(commands: web::Data<Commands>, query: web::Query<CorporaParams>) -> impl Responder {
	match commands.list_corpora_in(query.repository.as_deref()) {
		Ok(pages) => HttpResponse::Ok().json(pages),
		Err(e) => error_response(&e),
	}
}

#[get("/v1/repositories")]
async fn get_repositories(commands: web::Data<Commands>) -> impl Responder {
	HttpResponse::Ok().json(commands.repositories())
}

#[get("/v1/fanfic")]
async fn get_fanfic(commands: web::Data<Commands>, query: web::Query<FanficParams>) -> impl Responder {
	let pairing: Pairing = match query.pairing.as_deref().unwrap_or_default().parse() {
		Ok(pairing) => pairing,
		Err(_) => return HttpResponse::BadRequest().body("Pairing must be one of any, mm, ff or mf"),
	};
	HttpResponse::Ok().body(commands.fanfic_reply(query.person1.as_deref(), query.person2.as_deref(), pairing))
}

/// HTTP PUT endpoint `/v1/update`
///
/// Takes a JSON batch of documents and answers with the update summary.
#[put("/v1/update")]
async fn put_update(commands: web::Data<Commands>, batch: web::Json<UpdateBatch>) -> impl Responder {
	match commands.update(batch.into_inner()) {
		Ok(summary) => HttpResponse::Ok().body(summary.to_string()),
		Err(e) => error_response(&e),
	}
}

#[put("/v1/admin/rename")]
async fn put_rename(
	commands: web::Data<Commands>,
	request: HttpRequest,
	query: web::Query<RenameParams>,
) -> impl Responder {
	match commands.rename(operator(&request), &query.old, &query.new) {
		Ok(()) => HttpResponse::Ok().body(format!("Renamed {} to {}.", query.old, query.new)),
		Err(e) => error_response(&e),
	}
}

#[put("/v1/admin/merge")]
async fn put_merge(
	commands: web::Data<Commands>,
	request: HttpRequest,
	query: web::Query<MergeParams>,
) -> impl Responder {
	match commands.merge(operator(&request), &query.a, &query.b, &query.out) {
		Ok(()) => HttpResponse::Ok().body(format!("Merged {} and {} into {}.", query.a, query.b, query.out)),
		Err(e) => error_response(&e),
	}
}

#[delete("/v1/admin/corpus")]
async fn delete_corpus(
	commands: web::Data<Commands>,
	request: HttpRequest,
	query: web::Query<RemoveParams>,
) -> impl Responder {
	match commands.remove(operator(&request), &query.name) {
		Ok(()) => HttpResponse::Ok().body(format!("Removed {}.", query.name)),
		Err(e) => error_response(&e),
	}
}

/// Main entry point for the server.
///
/// Loads the configuration, opens the corpus store and starts an Actix-web
/// HTTP server over the shared command surface.
///
/// # Notes
/// - The configuration path comes from `MARKOV_CONFIG` (defaults otherwise).
/// - The server binds to `MARKOV_BIND`, `127.0.0.1:5000` by default.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::init();

	let config = Config::from_env().map_err(std::io::Error::other)?;
	let commands = web::Data::new(Commands::new(config).map_err(std::io::Error::other)?);
	let bind = std::env::var("MARKOV_BIND").unwrap_or_else(|_| "127.0.0.1:5000".to_owned());
	info!("listening on {bind}");

	HttpServer::new(move || {
		App::new()
			.app_data(commands.clone())
			.service(get_markov)
			.service(get_corpora)
			.service(get_repositories)
			.service(get_fanfic)
			.service(put_update)
			.service(put_rename)
			.service(put_merge)
			.service(delete_corpus)
	})
		.bind(bind)?
		.run()
		.await
}
