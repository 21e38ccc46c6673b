use burrow::{strings::htmlentities, Config, RequestState};

fn main() -> Result<(), burrow::Error> {
    let config = Config::new()
        .cookie_name("MY_COOKIE")
        .save_path("session_files/");

    let mut state = RequestState::from_env(config);

    state.process_form()?;
    state.session_start()?;

    let action = state.param_str("action").map(str::to_ascii_lowercase);

    match action.as_deref() {
        Some("login") => {
            if let Some(phrase) = state.param("str").map(<[u8]>::to_vec) {
                if let Err(e) = state.session_register("str", phrase) {
                    log::warn!("login failed: {e}");
                }
            }
        }
        Some("logoff") => state.session_destroy()?,
        _ => {}
    }

    let mut page = String::from("<html><body>");

    match state.session().var_str("str") {
        Some(phrase) => page.push_str(&format!(
            "<b>Logged in</b><br>\
             <a href='session.cgi?action=logoff'>Log off</a><br>\
             Your pass phrase was <b>{}</b><br>",
            htmlentities(phrase)
        )),
        None => page.push_str(
            "<form action='session.cgi' method='get'>\
             Pass phrase: <input type='text' name='str'>\
             <input type='submit' value='Log in'>\
             <input type='hidden' name='action' value='login'>\
             </form>",
        ),
    }

    page.push_str(&format!(
        "Session files are saved in <b>{}</b>, cookie name <b>{}</b></body></html>",
        htmlentities(state.session().save_path()),
        htmlentities(state.session().cookie_name())
    ));

    state.write_body(page.as_bytes())?;

    state.end()
}
