use burrow::{Config, Html, RequestState};

fn main() -> Result<(), burrow::Error> {
    let mut state = RequestState::from_env(Config::new());

    state.process_form()?;

    let mut page = String::from("<p>Checked boxes:</p>");

    if state.param("action").is_some() {
        for value in state.params("check") {
            page.push_str(&String::from_utf8_lossy(value));
            page.push_str("<br>");
        }
    } else {
        page.push_str(
            "<form method='post'>\
             <input type='checkbox' name='check' value='computers'> Computers<br>\
             <input type='checkbox' name='check' value='net'> Internet<br>\
             <input type='checkbox' name='check' value='games'> Games<br>\
             <input type='hidden' name='action' value='1'>\
             <input type='submit'>\
             </form>",
        );
    }

    state.respond(Html(page))?;

    state.end()
}
