use serde::{Deserialize, Serialize};

/// Passing this as the specialization filter disables it.
pub const ALL_SPECIALIZATIONS: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: u32,
    pub name: String,
    pub specialization: String,
    pub clinic: String,
    pub address: String,
    pub whatsapp: String,
    /// Only doctors who agreed are offered as a WhatsApp contact.
    pub whatsapp_consent: bool,
    pub experience: String,
    pub qualifications: String,
    pub about: String,
}

impl Doctor {
    pub fn whatsapp_contact(&self) -> Option<&str> {
        self.whatsapp_consent.then_some(self.whatsapp.as_str())
    }

    fn matches_query(&self, query: &str) -> bool {
        [&self.name, &self.clinic, &self.address]
            .iter()
            .any(|field| field.to_lowercase().contains(query))
    }
}

/// Fixed list of consulting doctors.
#[derive(Debug, Clone)]
pub struct DoctorDirectory {
    doctors: Vec<Doctor>,
}

impl Default for DoctorDirectory {
    fn default() -> Self {
        Self::new(seed_doctors())
    }
}

impl DoctorDirectory {
    pub fn new(doctors: Vec<Doctor>) -> Self {
        Self { doctors }
    }

    pub fn all(&self) -> &[Doctor] {
        &self.doctors
    }

    pub fn get(&self, id: u32) -> Option<&Doctor> {
        self.doctors.iter().find(|doctor| doctor.id == id)
    }

    /// Case-insensitive match of `query` against name, clinic, or address, narrowed by a
    /// specialization substring. An empty query matches everyone.
    pub fn search(&self, query: &str, specialization: &str) -> Vec<&Doctor> {
        let query = query.trim().to_lowercase();
        let specialization = specialization.trim().to_lowercase();
        let any_specialization =
            specialization.is_empty() || specialization == ALL_SPECIALIZATIONS;

        self.doctors
            .iter()
            .filter(|doctor| {
                any_specialization || doctor.specialization.to_lowercase().contains(&specialization)
            })
            .filter(|doctor| doctor.matches_query(&query))
            .collect()
    }
}

#[allow(clippy::too_many_arguments)]
fn doctor(
    id: u32,
    name: &str,
    specialization: &str,
    clinic: &str,
    address: &str,
    whatsapp: &str,
    whatsapp_consent: bool,
    experience: &str,
    qualifications: &str,
    about: &str,
) -> Doctor {
    Doctor {
        id,
        name: name.to_string(),
        specialization: specialization.to_string(),
        clinic: clinic.to_string(),
        address: address.to_string(),
        whatsapp: whatsapp.to_string(),
        whatsapp_consent,
        experience: experience.to_string(),
        qualifications: qualifications.to_string(),
        about: about.to_string(),
    }
}

fn seed_doctors() -> Vec<Doctor> {
    vec![
        doctor(
            1,
            "Dr. Rajesh Sharma",
            "Autism Spectrum Disorder",
            "Rainbow Care Clinic",
            "Baner, Pune 411001",
            "+91 9975761521",
            true,
            "15 years",
            "MBBS, MD (Psychiatry)",
            "Specialized in autism spectrum disorder diagnosis and therapy. Passionate about helping children with developmental concerns.",
        ),
        doctor(
            2,
            "Dr. Priya Kapoor",
            "Pediatric Neurologist",
            "Child Development Center",
            "Kalyani Nagar, Pune 411006",
            "+91 8765432109",
            true,
            "12 years",
            "MBBS, MD (Pediatrics)",
            "Expert in pediatric neurology with focus on developmental disorders and neurological assessments.",
        ),
        doctor(
            3,
            "Dr. Amitabh Singh",
            "Neurologist",
            "Neural Care Hospital",
            "Shivajinagar, Pune 411004",
            "+91 7654321098",
            false,
            "20 years",
            "MBBS, MD (Neurology)",
            "Renowned neurologist with expertise in complex neurological conditions and behavioral assessments.",
        ),
    ]
}
