// Role-play framing for the interview stage.
// The system prompt is injected once per interview as the first history entry.

use crate::models::persona::Persona;

const ROLE_PLAY_INTRO: &str = "\
شما یک مدل زبانی هستید که باید نقش یک «سالمند ایرانی» را ایفا کنید و به پرسش‌ها به زبان فارسی پاسخ دهید.
حتماً لحن و ویژگی‌های شخصیتی داده‌شده را رعایت کنید و پاسخ‌ها را طبیعی و منسجم بنویسید.
شما باید در این مکالمه نقش زیر را بازی کنید و به همه پرسش‌ها با حفظ کامل شخصیت، لحن، و جهان‌بینی این فرد پاسخ دهید.
تاریخچه گفتگو داده شده است.";

const ROLE_PLAY_RULES: &str = "\
[دستورالعمل‌ها]
- فقط به فارسی پاسخ بده و از اصطلاحات و کلمات انگلیسی استفاده نکن.
- نیازی نیست در ابتدای صحبت سلام یا احوال‌پرسی کنی. شما در میانه یک مصاحبه هستید.
- از کلمات، اصطلاحات، و مثال‌هایی استفاده کن که با سن، تجربه، قومیت و فرهنگ این شخصیت هماهنگ باشد.
- شخصیت باید در طول مکالمه ثابت بماند و تغییر نکند.
- اگر سوالی خارج از تجربه شخصیت پرسیده شد، با توجه به محدودیت‌های دانشی و دیدگاه‌های او پاسخ بده.
- پاسخ‌ها باید در یک پاراگراف و ۲ الی ۱۰ جمله باشد.";

/// Renders the persona description and role-play instructions.
pub fn format_system_prompt(persona: &Persona) -> String {
    let lines = [
        ("سن", persona.age.to_string()),
        ("جنسیت", persona.gender.clone()),
        ("وضعیت تاهل", persona.marital_status.clone()),
        ("فرزندان", persona.children.clone()),
        ("وضعیت زندگی", persona.living_situation.clone()),
        ("سلامت عمومی", persona.general_health.clone()),
        (
            "بیماری مزمن",
            persona.chronic_disease.clone().unwrap_or_else(|| "ندارد".to_string()),
        ),
        ("توانایی حرکتی", persona.mobility.clone()),
        ("شنوایی", persona.hearing_senses.clone()),
        ("بینایی", persona.vision_senses.clone()),
        ("انرژی روزانه", persona.daily_energy.clone()),
        ("تیپ شخصیتی", persona.personality_type.clone()),
        ("وضعیت شناختی", persona.cognitive_status.clone()),
        ("هیجان غالب", persona.dominant_emotion.clone()),
        ("هوش هیجانی", persona.emotional_intelligence.clone()),
        ("میزان هوش", persona.iq.clone()),
        ("نگرش به پیری", persona.attitude_toward_aging.clone()),
        ("نقش اجتماعی اصلی", persona.main_social_role.clone()),
        ("حمایت اجتماعی", persona.social_support.clone()),
        ("مشارکت اجتماعی", persona.social_participation.clone()),
        ("درآمد", persona.income.clone()),
        ("دهک اقتصادی", persona.economic_decile.to_string()),
        ("مسکن", persona.housing.clone()),
        (
            "دین و مذهب",
            format!("{} (سطح دینداری: {})", persona.religion_and_sect, persona.religiosity_level),
        ),
        ("صفات اخلاقی", persona.internalized_moral_traits.join("، ")),
        (
            "قومیت و زبان",
            format!("{} / {}", persona.ethnicity, persona.language),
        ),
        ("تجارب مهم زندگی", persona.important_personal_experiences.clone()),
        (
            "رضایت از زندگی و معنای سالمندی",
            format!(
                "{} / {}",
                persona.life_satisfaction, persona.meaning_and_purpose_in_old_age
            ),
        ),
    ];

    let profile = lines
        .iter()
        .map(|(label, value)| format!("{label}: {value}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!("{ROLE_PLAY_INTRO}\n\n[اطلاعات شخصیت]\n{profile}\n\n{ROLE_PLAY_RULES}")
}

/// Wraps one interview question as the user turn.
pub fn format_answer_prompt(question: &str) -> String {
    format!("پرسش: {question}\n\nپاسخ خود را مانند شخصیت تعریف شده بنویس.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::persona::fixtures;

    #[test]
    fn test_system_prompt_describes_persona() {
        let prompt = format_system_prompt(&fixtures::persona("p001"));
        assert!(prompt.contains("سن: 72"));
        assert!(prompt.contains("جنسیت: Female"));
        assert!(prompt.contains("بیماری مزمن: Type 2 Diabetes"));
        assert!(prompt.contains("صفات اخلاقی: Patience، Generosity"));
        assert!(prompt.contains("[دستورالعمل‌ها]"));
    }

    #[test]
    fn test_missing_chronic_disease_is_rendered() {
        let mut persona = fixtures::persona("p001");
        persona.chronic_disease = None;
        assert!(format_system_prompt(&persona).contains("بیماری مزمن: ندارد"));
    }

    #[test]
    fn test_answer_prompt_wraps_question() {
        let prompt = format_answer_prompt("حالتون چطوره؟");
        assert!(prompt.starts_with("پرسش: حالتون چطوره؟"));
    }
}
