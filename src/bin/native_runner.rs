use std::{env, process};

use polycall::{
    cli,
    runtime::{Runtimes, entry_points},
};

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();
    let (program, rest) = match args.split_first() {
        Some((program, rest)) => (program.as_str(), rest),
        None => ("native-runner", &[][..]),
    };
    let Ok(coordinate_args) = <&[String; 4]>::try_from(rest) else {
        eprintln!("Usage: {} <lat1> <long1> <lat2> <long2>", program);
        process::exit(1);
    };
    let [a_lat, a_long, b_lat, b_long] = cli::coordinates(coordinate_args).to_array();

    let mut runtimes = Runtimes::new();
    let thread = match runtimes.create_isolate() {
        Ok(thread) => thread,
        Err(err) => {
            eprintln!("initialization error: {}", err);
            process::exit(1);
        }
    };
    match entry_points::distance(&thread, a_lat, a_long, b_lat, b_long) {
        Ok(distance) => println!("{:.2} km", distance),
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    }
    runtimes.destroy_isolate();
}
