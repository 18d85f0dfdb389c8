use std::rc::Rc;

use site_interactions::backend::{ScriptedBackend, Submission, SubmissionBackend};
use site_interactions::config::SiteConfig;
use site_interactions::{ConsoleLevel, Error, EventTarget, Page, Result, Site};

const PODCAST_PAGE: &str = r##"
<html><body>
  <header class="site-header">
    <button class="nav-toggle" aria-expanded="false">Menu</button>
    <ul class="nav-menu">
      <li><a class="nav-link" href="/">Home</a></li>
      <li><a class="nav-link" href="/episodes">Episodes</a></li>
      <li><a class="nav-link" href="#faq">FAQ</a></li>
    </ul>
  </header>
  <main>
    <section class="section-header" id="hero">
      <a class="btn" id="cta" data-modal="email-modal">Get updates</a>
    </section>
    <article class="episode-card" id="ep1">
      <div class="audio-player" id="p1">
        <button class="play-btn" aria-label="Play episode"><i class="fas fa-play"></i></button>
        <div class="progress-bar"><div class="progress-fill"></div></div>
        <span class="current-time">0:00</span> / <span class="total-time">30:00</span>
      </div>
    </article>
    <article class="episode-card" id="ep2">
      <div class="audio-player" id="p2">
        <button class="play-btn" aria-label="Play episode"><i class="fas fa-play"></i></button>
        <div class="progress-bar"><div class="progress-fill"></div></div>
        <span class="current-time">0:00</span> / <span class="total-time">45:00</span>
      </div>
      <img id="cover" data-src="/covers/ep2.jpg" alt="Episode two">
    </article>
    <form class="search-form">
      <input class="search-input" type="search">
      <button type="submit">Search</button>
    </form>
    <select class="filter-select" data-filter="topic">
      <option value="">All</option><option value="rust">Rust</option>
    </select>
    <button class="clear-filters">Clear</button>
    <section id="faq">
      <div class="faq-item" id="q1">
        <button class="faq-question" aria-expanded="false">How often?</button>
        <div class="faq-answer" hidden>Weekly.</div>
      </div>
      <div class="faq-item" id="q2">
        <button class="faq-question" aria-expanded="false">Is it free?</button>
        <div class="faq-answer" hidden>Yes.</div>
      </div>
    </section>
    <form class="newsletter-form">
      <input type="email" name="newsletter-email" required>
      <span id="newsletter-email-error"></span>
      <button type="submit">Subscribe</button>
    </form>
    <form class="contact-form">
      <input name="name" required>
      <span id="name-error"></span>
      <input type="email" name="email" required>
      <span id="email-error"></span>
      <textarea name="message" required></textarea>
      <span id="message-error"></span>
      <button type="submit">Send Message</button>
    </form>
    <aside data-loading id="sponsors">Sponsors</aside>
  </main>
  <div id="email-modal" class="modal" aria-hidden="true">
    <div class="modal-overlay"></div>
    <div class="modal-content">
      <button class="modal-close" aria-label="Close">x</button>
      <form class="email-capture-form">
        <input type="email" name="capture-email">
        <span id="capture-email-error"></span>
        <button type="submit">Notify me</button>
      </form>
    </div>
  </div>
  <button class="scroll-to-top">Top</button>
  <div id="announcements" aria-live="polite"></div>
</body></html>
"##;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn load(backend: &Rc<ScriptedBackend>) -> Result<(Page, Site)> {
    load_with(backend, SiteConfig::default())
}

fn load_with(backend: &Rc<ScriptedBackend>, config: SiteConfig) -> Result<(Page, Site)> {
    init_tracing();
    let mut page = Page::from_html_with_url("https://pod.example/episodes", PODCAST_PAGE)?;
    page.set_layout(".site-header", 0, 80)?;
    page.set_layout("#hero", 80, 400)?;
    page.set_layout("#ep1", 600, 300)?;
    page.set_layout("#ep2", 1_600, 300)?;
    page.set_layout("#cover", 1_700, 150)?;
    page.set_layout("#faq", 2_400, 400)?;
    let shared: Rc<dyn SubmissionBackend> = backend.clone();
    let site = Site::with_config(shared, config);
    site.install(&mut page)?;
    page.finish_loading()?;
    Ok((page, site))
}

fn console_errors(page: &mut Page) -> Vec<String> {
    page.take_console_messages()
        .into_iter()
        .filter(|message| message.level == ConsoleLevel::Error)
        .map(|message| message.text)
        .collect()
}

#[test]
fn whole_page_initializes_every_component() -> Result<()> {
    let backend = Rc::new(ScriptedBackend::new());
    let (mut page, site) = load(&backend)?;
    let report = site
        .report()
        .ok_or_else(|| Error::Runtime("site never initialized".into()))?;
    assert!(report.is_complete(), "{:?}", report.failed);
    assert_eq!(report.initialized.len(), 11);

    page.assert_attr(".nav-link[href=\"/episodes\"]", "aria-current", Some("page"))?;
    page.assert_class(".nav-link[href=\"/\"]", "active", false)?;
    page.assert_class("#hero", "animate-in", true)?;
    page.assert_class("#ep2", "animate-in", false)?;
    page.assert_class("#sponsors", "loading", true)?;
    assert!(console_errors(&mut page).is_empty());
    Ok(())
}

#[test]
fn faq_keeps_a_single_item_open() -> Result<()> {
    let backend = Rc::new(ScriptedBackend::new());
    let (mut page, _site) = load(&backend)?;
    page.click("#q1 .faq-question")?;
    page.click("#q2 .faq-question")?;
    page.assert_attr("#q1 .faq-question", "aria-expanded", Some("false"))?;
    page.assert_attr("#q1 .faq-answer", "hidden", Some(""))?;
    page.assert_attr("#q2 .faq-question", "aria-expanded", Some("true"))?;
    page.assert_attr("#q2 .faq-answer", "hidden", None)?;
    Ok(())
}

#[test]
fn starting_a_second_episode_pauses_the_first() -> Result<()> {
    let backend = Rc::new(ScriptedBackend::new());
    let (mut page, _site) = load(&backend)?;
    page.click("#p1 .play-btn")?;
    page.advance_time(3_000)?;
    page.click("#p2 .play-btn")?;

    page.assert_class("#p1 .play-btn i", "fa-play", true)?;
    page.assert_attr("#p1 .play-btn", "aria-label", Some("Play episode"))?;
    page.assert_class("#p2 .play-btn i", "fa-pause", true)?;
    page.assert_attr("#p2 .play-btn", "aria-label", Some("Pause episode"))?;

    page.advance_time(2_000)?;
    page.assert_text("#p1 .current-time", "0:03")?;
    page.assert_text("#p2 .current-time", "0:02")?;
    Ok(())
}

#[test]
fn invalid_modal_email_never_reaches_the_backend() -> Result<()> {
    let backend = Rc::new(ScriptedBackend::new());
    let (mut page, _site) = load(&backend)?;
    page.click("#cta")?;
    page.type_text(".email-capture-form input", "listener@localhost")?;
    page.submit(".email-capture-form")?;

    assert!(backend.email_calls().is_empty());
    page.assert_attr("#email-modal", "aria-hidden", Some("false"))?;
    page.assert_text("#capture-email-error", "Please enter a valid email address")?;
    Ok(())
}

#[test]
fn modal_email_success_closes_the_dialog() -> Result<()> {
    let backend = Rc::new(ScriptedBackend::new());
    let (mut page, _site) = load(&backend)?;
    page.click("#cta")?;
    page.advance_time(100)?;
    page.assert_focused(".modal-close")?;
    page.type_text(".email-capture-form input", "fan@pod.example")?;
    page.submit(".email-capture-form")?;
    assert_eq!(backend.email_calls(), vec!["fan@pod.example"]);

    page.advance_time(1_500)?;
    page.assert_text("#announcements", "Successfully subscribed! Check your inbox.")?;
    page.advance_time(2_000)?;
    page.assert_attr("#email-modal", "aria-hidden", Some("true"))?;
    page.assert_style("body", "overflow", "")?;
    Ok(())
}

#[test]
fn contact_form_with_missing_message_asks_for_corrections() -> Result<()> {
    let backend = Rc::new(ScriptedBackend::new());
    let (mut page, _site) = load(&backend)?;
    page.type_text("[name=\"name\"]", "Grace")?;
    page.type_text("[name=\"email\"]", "grace@example.com")?;
    page.click(".contact-form button")?;

    assert!(backend.contact_calls().is_empty());
    page.assert_text("#announcements", "Please correct the errors in the form")?;
    page.assert_text("#message-error", "This field is required")?;
    page.assert_attr("[name=\"message\"]", "aria-invalid", Some("true"))?;
    Ok(())
}

#[test]
fn newsletter_failure_leaves_the_form_usable() -> Result<()> {
    let backend = Rc::new(ScriptedBackend::new());
    backend.push_email_outcome(Submission::fail_after(1_500, "Network error"));
    let (mut page, _site) = load(&backend)?;
    page.type_text(".newsletter-form input", "fan@pod.example")?;
    page.submit(".newsletter-form")?;
    page.advance_time(1_500)?;
    page.assert_text(".newsletter-form button", "Try Again")?;
    page.assert_attr(".newsletter-form button", "disabled", None)?;

    page.submit(".newsletter-form")?;
    page.advance_time(1_500)?;
    page.assert_text(".newsletter-form button", "Subscribed!")?;
    assert_eq!(backend.email_calls().len(), 2);
    Ok(())
}

#[test]
fn header_hides_going_down_and_returns_going_up() -> Result<()> {
    let backend = Rc::new(ScriptedBackend::new());
    let (mut page, _site) = load(&backend)?;
    page.scroll_to(120)?;
    page.advance_time(10)?;
    page.scroll_to(250)?;
    page.assert_class(".site-header", "header-hidden", true)?;
    page.advance_time(10)?;
    page.scroll_to(230)?;
    page.assert_class(".site-header", "header-hidden", false)?;
    page.assert_class(".site-header", "scrolled", true)?;
    Ok(())
}

#[test]
fn scrolling_reveals_cards_and_loads_lazy_images() -> Result<()> {
    let backend = Rc::new(ScriptedBackend::new());
    let (mut page, _site) = load(&backend)?;
    page.assert_attr("#cover", "src", None)?;
    page.scroll_to(1_000)?;
    page.assert_class("#ep2", "animate-in", true)?;
    page.assert_attr("#cover", "src", Some("/covers/ep2.jpg"))?;
    page.assert_class("#cover", "loaded", true)?;
    page.assert_class(".scroll-to-top", "visible", true)?;
    Ok(())
}

#[test]
fn in_page_link_scrolls_below_the_header() -> Result<()> {
    let backend = Rc::new(ScriptedBackend::new());
    let (mut page, _site) = load(&backend)?;
    page.click(".nav-link[href=\"#faq\"]")?;
    let requests = page.take_scroll_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].top, 2_400 - 80 - 20);
    Ok(())
}

#[test]
fn search_and_filters_are_recorded() -> Result<()> {
    let backend = Rc::new(ScriptedBackend::new());
    let (mut page, site) = load(&backend)?;
    page.type_text(".search-input", "ownership")?;
    page.advance_time(500)?;
    page.select_option(".filter-select", "rust")?;
    page.click(".clear-filters")?;

    let activity = site.search_activity();
    assert_eq!(activity.queries, vec!["ownership"]);
    assert_eq!(activity.filters.len(), 2);
    assert_eq!(activity.filters[0].get("topic").map(String::as_str), Some("rust"));
    assert!(activity.filters[1].is_empty());
    page.assert_value(".filter-select", "")?;
    Ok(())
}

#[test]
fn uncaught_listener_failures_are_logged_globally() -> Result<()> {
    let backend = Rc::new(ScriptedBackend::new());
    let (mut page, _site) = load(&backend)?;
    page.take_console_messages();
    let hero = page
        .query_selector("#hero")?
        .ok_or_else(|| Error::SelectorNotFound("#hero".into()))?;
    page.add_event_listener(EventTarget::Node(hero), "click", |_, _| {
        Err(Error::Runtime("analytics offline".into()))
    });
    page.click("#hero")?;
    assert_eq!(
        console_errors(&mut page),
        vec!["Global error: runtime error: analytics offline"]
    );
    Ok(())
}

#[test]
fn configured_timings_replace_defaults() -> Result<()> {
    let config = SiteConfig::from_toml_str(
        r#"
        [timing]
        search_debounce_ms = 100
        deferred_load_min_ms = 10
        deferred_load_max_ms = 20
        "#,
    )?;
    let backend = Rc::new(ScriptedBackend::new());
    let (mut page, site) = load_with(&backend, config)?;
    page.type_text(".search-input", "borrowck")?;
    page.advance_time(100)?;
    assert_eq!(site.search_activity().queries, vec!["borrowck"]);
    page.assert_class("#sponsors", "loaded", true)?;
    Ok(())
}
