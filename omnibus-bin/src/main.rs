use std::io::{self, Write};
use std::process::ExitCode;

use omnibus_core::prelude::*;
use serde_json::Value;

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let (Some(mode), None) = (args.next(), args.next()) else {
        print_usage();
        return ExitCode::FAILURE;
    };

    let result = match mode.as_str() {
        "make_base" => make_base(),
        "process_requests" => process_requests(),
        _ => {
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    eprintln!("usage: omnibus [make_base|process_requests]");
}

/// The request document is always read from stdin; only the snapshot lives
/// in the filesystem.
fn read_document() -> Result<RequestDocument, Error> {
    serde_json::from_reader(io::stdin().lock())
        .map_err(|err| Error::MalformedRequest(err.to_string()))
}

fn make_base() -> Result<(), Error> {
    let document = read_document()?;
    let routing_settings = document
        .routing_settings
        .ok_or_else(|| Error::MalformedRequest("missing routing_settings".to_owned()))?;
    let render_settings = document
        .render_settings
        .ok_or_else(|| Error::MalformedRequest("missing render_settings".to_owned()))?;

    let catalogue = build_catalogue(&document.base_requests)?;
    let router = TransportRouter::new(&routing_settings, &catalogue)?;

    snapshot::save(
        &document.serialization_settings.file,
        &catalogue,
        &router,
        &routing_settings,
        &render_settings,
    )
}

fn process_requests() -> Result<(), Error> {
    let document = read_document()?;
    let base = snapshot::load(&document.serialization_settings.file)?;

    let handler = RequestHandler::new(&base.catalogue, &base.router, &base.render_settings);
    let answers = Value::Array(handler.process(&document.stat_requests));

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{answers}")?;

    Ok(())
}
