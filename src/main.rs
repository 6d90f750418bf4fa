#[macro_use]
extern crate rocket;

#[launch]
fn rocket() -> _ {
    let rocket = bulk_gateway::rocket();
    log::info!("Starting bulk gateway");
    rocket
}
