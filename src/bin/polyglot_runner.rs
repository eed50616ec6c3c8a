use std::{env, ffi::CString, process};

use polycall::{
    cli,
    runtime::{Runtimes, entry_points},
    scripts::{Language, fragment_for},
};

fn fail(err: impl std::fmt::Display) -> ! {
    eprintln!("{}", err);
    process::exit(1);
}

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();
    if args.len() != 6 {
        eprintln!(
            "Usage: {} <language>[js|ruby] <lat1> <long1> <lat2> <long2>",
            args.first().map(String::as_str).unwrap_or("polyglot-runner")
        );
        process::exit(1);
    }
    let language = Language::from_tag(&args[1]).unwrap_or_else(|err| fail(err));
    let coordinate_args = [
        args[2].clone(),
        args[3].clone(),
        args[4].clone(),
        args[5].clone(),
    ];
    let [a_lat, a_long, b_lat, b_long] = cli::coordinates(&coordinate_args).to_array();

    let fragment = fragment_for(language);
    let tag = CString::new(language.id()).unwrap_or_else(|err| fail(err));
    let code = CString::new(fragment.source).unwrap_or_else(|err| fail(err));

    let mut runtimes = Runtimes::new();
    let thread = runtimes.create_isolate().unwrap_or_else(|err| fail(err));
    let result =
        entry_points::distance_polyglot_no_cache(&thread, &tag, &code, a_lat, a_long, b_lat, b_long);
    runtimes.destroy_isolate();
    match result {
        Ok(distance) => println!("{:.2} km", distance),
        Err(err) => fail(err),
    }
}
